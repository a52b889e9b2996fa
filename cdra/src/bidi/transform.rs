//! Host/client layout conversion bound to one CCSID.

use crate::ccsid::CharacterSetId;
use crate::error::ConvError;

use super::engine::{transform, BidiTransform};
use super::flags::{self, flags_for, BidiFlagSet, OrderingType, Orientation, StringType};

/// Options for one layout conversion through `AS400BidiTransform`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidiConversionProperties {
    /// Host string type for this conversion. DEFAULT keeps the one bound to
    /// the CCSID; NONE turns layout conversion off.
    pub bidi_string_type: StringType,
    /// Strip direction marks when host and client ordering is implicit to
    /// visual.
    pub remove_marks_on_implicit_to_visual: bool,
    pub imp_to_imp: bool,
    pub round_trip: bool,
    pub win_compatible: bool,
    pub insert_markers: bool,
    pub remove_markers: bool,
    pub word_break: bool,
    pub destination_required: bool,
    pub src_to_dst_map_required: bool,
    pub dst_to_src_map_required: bool,
    pub property_map_required: bool,
}

impl Default for BidiConversionProperties {
    fn default() -> Self {
        Self {
            bidi_string_type: StringType::DEFAULT,
            remove_marks_on_implicit_to_visual: false,
            imp_to_imp: true,
            round_trip: false,
            win_compatible: false,
            insert_markers: false,
            remove_markers: false,
            word_break: false,
            destination_required: true,
            src_to_dst_map_required: false,
            dst_to_src_map_required: false,
            property_map_required: false,
        }
    }
}

impl BidiConversionProperties {
    pub fn with_string_type(mut self, st: StringType) -> Self {
        self.bidi_string_type = st;
        self
    }
    pub fn with_remove_marks_on_implicit_to_visual(mut self, on: bool) -> Self {
        self.remove_marks_on_implicit_to_visual = on;
        self
    }
    pub fn with_imp_to_imp(mut self, on: bool) -> Self {
        self.imp_to_imp = on;
        self
    }
    pub fn with_round_trip(mut self, on: bool) -> Self {
        self.round_trip = on;
        self
    }
    pub fn with_win_compatible(mut self, on: bool) -> Self {
        self.win_compatible = on;
        self
    }
    pub fn with_insert_markers(mut self, on: bool) -> Self {
        self.insert_markers = on;
        self
    }
    pub fn with_remove_markers(mut self, on: bool) -> Self {
        self.remove_markers = on;
        self
    }
    pub fn with_word_break(mut self, on: bool) -> Self {
        self.word_break = on;
        self
    }
    pub fn with_destination_required(mut self, on: bool) -> Self {
        self.destination_required = on;
        self
    }
    pub fn with_src_to_dst_map(mut self, on: bool) -> Self {
        self.src_to_dst_map_required = on;
        self
    }
    pub fn with_dst_to_src_map(mut self, on: bool) -> Self {
        self.dst_to_src_map_required = on;
        self
    }
    pub fn with_property_map(mut self, on: bool) -> Self {
        self.property_map_required = on;
        self
    }

    fn apply(self: &Self, bdx: &mut BidiTransform) {
        bdx.imp_to_imp = self.imp_to_imp;
        bdx.round_trip = self.round_trip;
        bdx.win_compatible = self.win_compatible;
        bdx.insert_markers = self.insert_markers;
        bdx.word_break = self.word_break;
        bdx.destination_required = self.destination_required;
        bdx.src_to_dst_map_required = self.src_to_dst_map_required;
        bdx.dst_to_src_map_required = self.dst_to_src_map_required;
        bdx.property_map_required = self.property_map_required;
        bdx.remove_markers = self.remove_markers
            || (self.remove_marks_on_implicit_to_visual
                && bdx.flags_in.ordering == OrderingType::Implicit
                && bdx.flags_out.ordering == OrderingType::Visual);
    }
}

/// Converts text between the layout a host CCSID stores it in and the
/// layout the client works with.
///
/// Not for concurrent use: the two transfer objects are reused by every
/// call.
pub struct AS400BidiTransform {
    ccsid: CharacterSetId,
    host_type: StringType,
    client_type: StringType,
    host_flags: BidiFlagSet,
    client_flags: BidiFlagSet,
    to_client: BidiTransform,
    to_host: BidiTransform,
}

fn check_settable(st: StringType) -> Result<(), ConvError> {
    if st == StringType::DEFAULT || st.is_concrete() {
        Ok(())
    } else {
        Err(ConvError::InvalidArgument {
            name: "string type",
            value: i64::from(st.code()),
        })
    }
}

// Concrete types and DEFAULT always have flags; anything else falls back.
fn flags_or(st: StringType, fallback: BidiFlagSet) -> BidiFlagSet {
    flags_for(st).unwrap_or(fallback)
}

impl AS400BidiTransform {
    pub fn new(ccsid: CharacterSetId) -> Self {
        let flags = BidiFlagSet::default();
        let mut t = Self {
            ccsid: ccsid,
            host_type: StringType::DEFAULT,
            client_type: StringType::DEFAULT,
            host_flags: flags,
            client_flags: flags,
            to_client: BidiTransform::default(),
            to_host: BidiTransform::default(),
        };
        t.set_ccsid(ccsid);
        t
    }

    pub fn is_bidi_ccsid(ccsid: CharacterSetId) -> bool {
        flags::is_bidi_ccsid(ccsid)
    }

    /// Rebind to `ccsid`, taking its default host string type. This resets
    /// the client string type too, as `set_host_string_type` does.
    pub fn set_ccsid(self: &mut Self, ccsid: CharacterSetId) {
        self.ccsid = ccsid;
        self.bind_host(flags::default_string_type(ccsid));
    }

    pub fn ccsid(self: &Self) -> CharacterSetId {
        self.ccsid
    }

    /// Set the host string type. DEFAULT means the CCSID's default.
    ///
    /// This also resets the client string type, to ST5 for a host type with
    /// left-to-right orientation and ST6 otherwise. Set the client type
    /// after the host type, not before.
    pub fn set_host_string_type(self: &mut Self, st: StringType) -> Result<(), ConvError> {
        check_settable(st)?;
        self.bind_host(st);
        Ok(())
    }

    fn bind_host(self: &mut Self, st: StringType) {
        let st = if st == StringType::DEFAULT {
            flags::default_string_type(self.ccsid)
        } else {
            st
        };
        self.host_type = st;
        self.host_flags = flags_or(st, BidiFlagSet::default());
        self.client_type = match self.host_flags.orientation {
            Orientation::Ltr | Orientation::ContextualLtr => StringType::ST5,
            Orientation::Rtl | Orientation::ContextualRtl => StringType::ST6,
        };
        self.client_flags = flags_or(self.client_type, BidiFlagSet::default());
        debug!(
            "AS400BidiTransform: {} host {} client {}",
            self.ccsid, self.host_type, self.client_type
        );
    }

    pub fn set_client_string_type(self: &mut Self, st: StringType) -> Result<(), ConvError> {
        check_settable(st)?;
        self.client_type = st;
        self.client_flags = flags_or(st, BidiFlagSet::default());
        Ok(())
    }

    pub fn host_string_type(self: &Self) -> StringType {
        self.host_type
    }

    pub fn client_string_type(self: &Self) -> StringType {
        self.client_type
    }

    // Host flags for one call: the bound ones unless the properties name a
    // concrete type. NONE makes the layouts on both sides identical.
    fn host_flags_for(self: &Self, props: &BidiConversionProperties) -> Option<BidiFlagSet> {
        let st = props.bidi_string_type;
        if st == StringType::NONE {
            None
        } else if st.is_concrete() {
            Some(flags_or(st, self.host_flags))
        } else {
            Some(self.host_flags)
        }
    }

    /// Convert host-layout text to the client layout.
    pub fn to_client_layout(self: &mut Self, text: &str) -> String {
        let props = BidiConversionProperties::default();
        self.to_client_layout_with(text, &props).dest.clone()
    }

    /// Convert client-layout text to the host layout.
    pub fn to_host_layout(self: &mut Self, text: &str) -> String {
        let props = BidiConversionProperties::default();
        self.to_host_layout_with(text, &props).dest.clone()
    }

    /// Host to client with explicit options; the returned transfer object
    /// carries the maps and counts asked for.
    pub fn to_client_layout_with(
        self: &mut Self,
        text: &str,
        props: &BidiConversionProperties,
    ) -> &BidiTransform {
        let (from, to) = match self.host_flags_for(props) {
            Some(host) => (host, self.client_flags),
            None => (self.client_flags, self.client_flags),
        };
        Self::run(&mut self.to_client, from, to, text, props);
        &self.to_client
    }

    /// Client to host with explicit options.
    pub fn to_host_layout_with(
        self: &mut Self,
        text: &str,
        props: &BidiConversionProperties,
    ) -> &BidiTransform {
        let (from, to) = match self.host_flags_for(props) {
            Some(host) => (self.client_flags, host),
            None => (self.client_flags, self.client_flags),
        };
        Self::run(&mut self.to_host, from, to, text, props);
        &self.to_host
    }

    fn run(
        bdx: &mut BidiTransform,
        from: BidiFlagSet,
        to: BidiFlagSet,
        text: &str,
        props: &BidiConversionProperties,
    ) {
        bdx.flags_in = from;
        bdx.flags_out = to;
        props.apply(bdx);
        if from == to {
            bdx.insert_markers = false;
            bdx.remove_markers = false;
        }
        transform(text, bdx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: char = '\u{5D0}';
    const B: char = '\u{5D1}';

    #[test]
    fn arabic_host_defaults() {
        let t = AS400BidiTransform::new(CharacterSetId::ARABIC);
        assert_eq!(t.host_string_type(), StringType::ST4);
        assert_eq!(t.client_string_type(), StringType::ST5);
        assert!(AS400BidiTransform::is_bidi_ccsid(CharacterSetId::ARABIC));
    }

    #[test]
    fn non_bidi_ccsid_defaults() {
        let t = AS400BidiTransform::new(CharacterSetId::CP037);
        assert_eq!(t.host_string_type(), StringType::DEFAULT);
        assert_eq!(t.client_string_type(), StringType::ST5);
    }

    #[test]
    fn host_setter_resets_client_type() {
        let mut t = AS400BidiTransform::new(CharacterSetId::HEBREW);
        t.set_client_string_type(StringType::ST11).unwrap();
        assert_eq!(t.client_string_type(), StringType::ST11);
        t.set_host_string_type(StringType::ST8).unwrap();
        assert_eq!(t.client_string_type(), StringType::ST6);
        t.set_host_string_type(StringType::ST7).unwrap();
        assert_eq!(t.client_string_type(), StringType::ST5);
        t.set_host_string_type(StringType::DEFAULT).unwrap();
        assert_eq!(t.host_string_type(), StringType::ST4);
    }

    #[test]
    fn setters_reject_none() {
        let mut t = AS400BidiTransform::new(CharacterSetId::HEBREW);
        assert!(t.set_host_string_type(StringType::NONE).is_err());
        assert!(t.set_client_string_type(StringType::NONE).is_err());
        assert_eq!(t.host_string_type(), StringType::ST4);
    }

    #[test]
    fn host_client_round_trip() {
        let _ = env_logger::try_init();
        let mut t = AS400BidiTransform::new(CharacterSetId::HEBREW);
        let host: String = ['a', 'b', ' ', B, A].iter().collect();
        let client = t.to_client_layout(&host);
        assert_eq!(client, ['a', 'b', ' ', A, B].iter().collect::<String>());
        assert_eq!(t.to_host_layout(&client), host);
    }

    #[test]
    fn none_disables_layout() {
        let mut t = AS400BidiTransform::new(CharacterSetId::HEBREW);
        let host: String = ['a', ' ', B, A].iter().collect();
        let props = BidiConversionProperties::default()
            .with_string_type(StringType::NONE)
            .with_src_to_dst_map(true);
        let out = t.to_client_layout_with(&host, &props);
        assert_eq!(out.dest, host);
        assert_eq!(out.src_to_dst_map, vec![0, 1, 2, 3]);
    }

    #[test]
    fn remove_marks_only_implicit_to_visual() {
        let mut t = AS400BidiTransform::new(CharacterSetId::HEBREW);
        let client: String = ['\u{200E}', 'a', ' ', A].iter().collect();
        let props = BidiConversionProperties::default().with_remove_marks_on_implicit_to_visual(true);
        let out = t.to_host_layout_with(&client, &props);
        assert_eq!(out.dest, "a \u{5D0}");
        let out = t.to_client_layout_with("a \u{5D0}", &props);
        assert!(!out.remove_markers);
    }
}
