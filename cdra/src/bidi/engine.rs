//! The layout transform.
//!
//! Every conversion goes through logical order. The source is brought into
//! logical order with a resolved level per character, the per-character
//! rewrites (swapping, shaping, digits) are applied there, and the result is
//! laid out in the destination ordering. Each character carries its source
//! index the whole way, which is all the index maps need.
//!
//! Level resolution is the Unicode bidi algorithm from `unicode_bidi`, fed
//! through `ClassSource` so the class-level options apply. Reordering (rule
//! L2) is done here on plain level bytes, since the same reversal takes
//! display order back to logical order.

use unicode_bidi::{BidiInfo, LTR_LEVEL, RTL_LEVEL};

use super::classes::{self, ClassSource};
use super::flags::{BidiFlagSet, OrderingType, TextShape};
use super::shaping;
use super::{LRM, RLM};

const LEVEL_MASK: u8 = 0x3F;
const CELL_START: u8 = 0x80;
const_assert_eq!(assert_level_bits; LEVEL_MASK & CELL_START, 0);

/// Configuration and results for one layout transform.
///
/// Set the flag sets and options, call `transform`, then read the outputs.
/// The output vectors are cleared and refilled on each call, so reusing one
/// `BidiTransform` reuses their allocations.
#[derive(Debug, Clone)]
pub struct BidiTransform {
    pub flags_in: BidiFlagSet,
    pub flags_out: BidiFlagSet,

    /// Reorder between implicit types whose orientations differ.
    pub imp_to_imp: bool,
    /// European digits take part in reordering as Arabic numbers.
    pub round_trip: bool,
    /// Number separators and terminators reorder as neutrals.
    pub win_compatible: bool,
    /// Pin the layout of the output with LRM/RLM when producing implicit
    /// text from a reordering.
    pub insert_markers: bool,
    /// Drop LRM, RLM and ALM from the output.
    pub remove_markers: bool,
    /// Contextual digits look back only to the start of the word.
    pub word_break: bool,
    /// Contextual orientations reuse the previous call's paragraph level
    /// instead of looking for a strong character.
    pub continuation: bool,

    pub destination_required: bool,
    pub src_to_dst_map_required: bool,
    pub dst_to_src_map_required: bool,
    pub property_map_required: bool,

    pub dest: String,
    /// Destination index per source character, -1 where it was removed.
    pub src_to_dst_map: Vec<i32>,
    /// Source index per destination character, -1 for inserted markers.
    pub dst_to_src_map: Vec<i32>,
    /// Per source character: resolved level in the low six bits, high bit
    /// set when the character starts a display cell.
    pub property_map: Vec<u8>,
    pub inp_count: usize,
    pub out_count: usize,

    para_level: Option<u8>,
}

impl BidiTransform {
    pub fn new(flags_in: BidiFlagSet, flags_out: BidiFlagSet) -> Self {
        Self {
            flags_in: flags_in,
            flags_out: flags_out,
            imp_to_imp: true,
            round_trip: false,
            win_compatible: false,
            insert_markers: false,
            remove_markers: false,
            word_break: false,
            continuation: false,
            destination_required: true,
            src_to_dst_map_required: false,
            dst_to_src_map_required: false,
            property_map_required: false,
            dest: String::new(),
            src_to_dst_map: Vec::new(),
            dst_to_src_map: Vec::new(),
            property_map: Vec::new(),
            inp_count: 0,
            out_count: 0,
            para_level: None,
        }
    }

    /// Paragraph level of the logical text from the last call.
    pub fn paragraph_level(self: &Self) -> Option<u8> {
        self.para_level
    }
}

impl Default for BidiTransform {
    fn default() -> Self {
        Self::new(BidiFlagSet::default(), BidiFlagSet::default())
    }
}

#[derive(Debug, Clone, Copy)]
struct Cell {
    ch: char,
    // -1 for inserted markers.
    src: i32,
    level: u8,
}

/// Resolve levels for `chars` as logical text at paragraph level `para`.
fn resolve_levels(chars: &[char], para: u8, source: &ClassSource) -> Vec<u8> {
    let text: String = chars.iter().collect();
    let base = if para % 2 == 1 { RTL_LEVEL } else { LTR_LEVEL };
    let info = BidiInfo::new_with_data_source(source, &text, Some(base));
    let mut out = Vec::with_capacity(chars.len());
    for paragraph in &info.paragraphs {
        let range = paragraph.range.clone();
        let levels = info.reordered_levels(paragraph, range.clone());
        for (i, _) in text[range.clone()].char_indices() {
            out.push(levels[range.start + i].number());
        }
    }
    debug_assert_eq!(out.len(), chars.len());
    out
}

fn assign_levels(cells: &mut [Cell], para: u8, source: &ClassSource) {
    let chars: Vec<char> = cells.iter().map(|c| c.ch).collect();
    let levels = resolve_levels(&chars, para, source);
    for (cell, level) in cells.iter_mut().zip(levels) {
        cell.level = level;
    }
}

/// Rule L2 as a permutation: reverse every maximal run at or above each
/// level, from the highest level down to the lowest odd one.
fn visual_order(levels: &[u8]) -> Vec<usize> {
    let n = levels.len();
    let mut order: Vec<usize> = (0..n).collect();
    let max_level = match levels.iter().cloned().max() {
        Some(m) if m > 0 => m,
        _ => return order,
    };
    let min_level = levels.iter().cloned().min().unwrap_or(0);
    let lowest_odd = if min_level % 2 == 1 { min_level } else { min_level + 1 };
    let mut level = max_level;
    while level >= lowest_odd {
        let mut i = 0;
        while i < n {
            if levels[order[i]] >= level {
                let start = i;
                while i < n && levels[order[i]] >= level {
                    i += 1;
                }
                order[start..i].reverse();
            } else {
                i += 1;
            }
        }
        level -= 1;
    }
    order
}

/// Apply L2 to `cells` line by line, levels travelling with their
/// characters. Paragraph separators stay where they are, so applying it
/// twice is the identity.
fn reorder(cells: &mut [Cell]) {
    for line in cells.split_mut(|c| classes::is_paragraph_separator(c.ch)) {
        let levels: Vec<u8> = line.iter().map(|c| c.level).collect();
        let order = visual_order(&levels);
        let reordered: Vec<Cell> = order.iter().map(|&i| line[i]).collect();
        line.copy_from_slice(&reordered);
    }
}

// Right-to-left storage: each line read from its right edge.
fn reverse_lines(cells: &mut [Cell]) {
    for line in cells.split_mut(|c| classes::is_paragraph_separator(c.ch)) {
        line.reverse();
    }
}

fn direction_mark(level: u8) -> char {
    if level % 2 == 1 {
        RLM
    } else {
        LRM
    }
}

/// Surround every level run of logical `cells` with strong marks of the
/// run's direction, plus one leading mark, so that resolving the result
/// again yields the same levels.
///
/// The leading mark carries direction `lead`, which a contextual reader of
/// the output recovers as the first strong character. It is always present
/// when runs are marked; otherwise it is written only when `lead_needed`
/// and the text's own first strong character would not give `lead`.
fn insert_markers(cells: Vec<Cell>, para: u8, lead: u8, lead_needed: bool) -> Vec<Cell> {
    let mark = |ch: char, level: u8| Cell {
        ch: ch,
        src: -1,
        level: level,
    };
    if cells.iter().all(|c| c.level == para) {
        let first = cells.iter().filter_map(|c| classes::strong_direction(c.ch)).next();
        if !lead_needed || first == Some(lead % 2 == 1) {
            return cells;
        }
        let mut out = Vec::with_capacity(cells.len() + 1);
        out.push(mark(direction_mark(lead), para));
        out.extend(cells);
        return out;
    }
    let run_mark = |level: u8| {
        if level == para {
            direction_mark(para)
        } else if para % 2 == 0 {
            RLM
        } else {
            LRM
        }
    };
    let mut out = Vec::with_capacity(cells.len() * 2 + 1);
    out.push(mark(direction_mark(lead), para));
    let mut i = 0;
    while i < cells.len() {
        let level = cells[i].level;
        let start = i;
        while i < cells.len() && cells[i].level == level {
            i += 1;
        }
        let m = run_mark(level);
        out.push(mark(m, level));
        out.extend_from_slice(&cells[start..i]);
        out.push(mark(m, level));
    }
    out
}

fn rewrite_chars<F: FnOnce(&mut [char])>(cells: &mut [Cell], f: F) {
    let mut chars: Vec<char> = cells.iter().map(|c| c.ch).collect();
    f(&mut chars);
    for (cell, ch) in cells.iter_mut().zip(chars) {
        cell.ch = ch;
    }
}

/// Paragraph level of the source as stored.
fn source_level(flags: &BidiFlagSet, chars: &[char], previous: Option<u8>, continuation: bool) -> u8 {
    let orientation = flags.orientation;
    if !orientation.is_contextual() {
        return orientation.fallback_level();
    }
    match previous {
        Some(p) if continuation => p,
        _ => classes::first_strong_level(chars.iter().cloned(), orientation.fallback_level()),
    }
}

/// Convert `src` from `bdx.flags_in` layout to `bdx.flags_out` layout,
/// filling the outputs `bdx` asks for.
pub fn transform(src: &str, bdx: &mut BidiTransform) {
    let fin = bdx.flags_in;
    let fout = bdx.flags_out;
    let source = ClassSource {
        round_trip: bdx.round_trip,
        win_compatible: bdx.win_compatible,
    };
    let chars: Vec<char> = src.chars().collect();
    let mut cells: Vec<Cell> = chars
        .iter()
        .enumerate()
        .map(|(i, &ch)| Cell {
            ch: ch,
            src: i as i32,
            level: 0,
        })
        .collect();
    bdx.inp_count = cells.len();

    // Into logical order.
    let p_src = source_level(&fin, &chars, bdx.para_level, bdx.continuation);
    let para = match fin.ordering {
        OrderingType::Implicit => {
            assign_levels(&mut cells, p_src, &source);
            p_src
        }
        OrderingType::Visual => {
            // Right-to-left storage starts at the right edge.
            if p_src % 2 == 1 {
                reverse_lines(&mut cells);
            }
            let para = if fout.ordering == OrderingType::Implicit && !fout.orientation.is_contextual() {
                fout.orientation.fallback_level()
            } else {
                p_src
            };
            assign_levels(&mut cells, para, &source);
            reorder(&mut cells);
            para
        }
    };
    bdx.para_level = Some(para);

    if bdx.property_map_required {
        bdx.property_map.clear();
        bdx.property_map.resize(bdx.inp_count, 0);
        for cell in &cells {
            let mut prop = cell.level & LEVEL_MASK;
            if !classes::is_nsm(cell.ch) {
                prop |= CELL_START;
            }
            bdx.property_map[cell.src as usize] = prop;
        }
    }

    // Per-character rewrites, in logical order.
    if fin.swap != fout.swap {
        for cell in cells.iter_mut().filter(|c| c.level % 2 == 1) {
            if let Some(m) = classes::mirrored(cell.ch) {
                cell.ch = m;
            }
        }
    }
    match (fin.text_shape, fout.text_shape) {
        (TextShape::Shaped, TextShape::Nominal) => rewrite_chars(&mut cells, shaping::deshape),
        (TextShape::Nominal, TextShape::Shaped) => rewrite_chars(&mut cells, shaping::shape),
        _ => {}
    }
    if fin.numerals != fout.numerals {
        let word_break = bdx.word_break;
        rewrite_chars(&mut cells, |chars| {
            shaping::shape_numerals(chars, fout.numerals, word_break)
        });
    }

    // Out to the destination layout. A contextual visual layout is stored
    // in the direction of the first strong character of the logical text,
    // markers included.
    let p_out = match (fout.ordering, fout.orientation.is_contextual()) {
        (_, false) => fout.orientation.fallback_level(),
        (OrderingType::Visual, true) => classes::first_strong_level(
            cells.iter().map(|c| c.ch),
            fout.orientation.fallback_level(),
        ),
        (OrderingType::Implicit, true) => para,
    };
    if bdx.remove_markers {
        cells.retain(|c| !classes::is_marker(c.ch));
    }
    match fout.ordering {
        OrderingType::Visual => {
            reorder(&mut cells);
            if p_out % 2 == 1 {
                reverse_lines(&mut cells);
            }
        }
        OrderingType::Implicit => {
            let mut reordered = fin.ordering == OrderingType::Visual;
            if fin.ordering == OrderingType::Implicit && bdx.imp_to_imp && p_out != para {
                // Keep the display: lay it out under the old level, then
                // read it back under the new one.
                reorder(&mut cells);
                assign_levels(&mut cells, p_out, &source);
                reorder(&mut cells);
                bdx.para_level = Some(p_out);
                reordered = true;
            }
            if bdx.insert_markers && reordered {
                // Contextual visual text keeps its own storage direction
                // in the leading mark, since the implicit side may not.
                let visual_context = fin.ordering == OrderingType::Visual && fin.orientation.is_contextual();
                let lead = if visual_context { p_src } else { p_out };
                let lead_needed = visual_context || fout.orientation.is_contextual();
                cells = insert_markers(cells, p_out, lead, lead_needed);
            }
        }
    }

    bdx.out_count = cells.len();
    bdx.dest.clear();
    if bdx.destination_required {
        bdx.dest.extend(cells.iter().map(|c| c.ch));
    }
    if bdx.src_to_dst_map_required {
        bdx.src_to_dst_map.clear();
        bdx.src_to_dst_map.resize(bdx.inp_count, -1);
        for (j, cell) in cells.iter().enumerate() {
            if cell.src >= 0 {
                bdx.src_to_dst_map[cell.src as usize] = j as i32;
            }
        }
    }
    if bdx.dst_to_src_map_required {
        bdx.dst_to_src_map.clear();
        bdx.dst_to_src_map.extend(cells.iter().map(|c| c.src));
    }
    debug!(
        "transform: {:?}/{:?} -> {:?}/{:?}, {} chars in, {} out",
        fin.ordering, fin.orientation, fout.ordering, fout.orientation, bdx.inp_count, bdx.out_count
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bidi::flags::{flags_for, Numerals, StringType};

    // Hebrew alef..he stand in for right-to-left letters below.
    const A: char = '\u{5D0}';
    const B: char = '\u{5D1}';
    const G: char = '\u{5D2}';

    fn bdx(from: StringType, to: StringType) -> BidiTransform {
        BidiTransform::new(flags_for(from).unwrap(), flags_for(to).unwrap())
    }

    fn s(chars: &[char]) -> String {
        chars.iter().collect()
    }

    #[test]
    fn l2_order() {
        assert_eq!(visual_order(&[0, 0, 1, 1, 0]), vec![0, 1, 3, 2, 4]);
        assert_eq!(visual_order(&[1, 1, 1]), vec![2, 1, 0]);
        assert_eq!(visual_order(&[0, 1, 1, 2, 2, 1]), vec![0, 5, 3, 4, 2, 1]);
        assert_eq!(visual_order(&[]), Vec::<usize>::new());
    }

    #[test]
    fn implicit_to_visual_reverses_rtl_runs() {
        let _ = env_logger::try_init();
        let mut t = bdx(StringType::ST5, StringType::ST4);
        let src = format!("ab {}{}{} cd", A, B, G);
        transform(&src, &mut t);
        assert_eq!(t.dest, format!("ab {}{}{} cd", G, B, A));
        assert_eq!(t.inp_count, 9);
        assert_eq!(t.out_count, 9);
    }

    #[test]
    fn visual_rtl_storage_is_reversed() {
        let mut t = bdx(StringType::ST6, StringType::ST8);
        let src = s(&[A, B, ' ', 'x', 'y']);
        transform(&src, &mut t);
        // Display "xy BA" read from the right.
        assert_eq!(t.dest, s(&[A, B, ' ', 'y', 'x']));

        let mut t = bdx(StringType::ST6, StringType::ST4);
        transform(&src, &mut t);
        assert_eq!(t.dest, s(&['x', 'y', ' ', B, A]));
    }

    #[test]
    fn swapping_mirrors_rtl_brackets() {
        let mut t = bdx(StringType::ST5, StringType::ST4);
        let src = s(&[A, '(', B, ')']);
        transform(&src, &mut t);
        // Reversed and mirrored: still reads "(B)" around the letters.
        assert_eq!(t.dest, s(&['(', B, ')', A]));

        let mut t = bdx(StringType::ST5, StringType::ST9);
        transform(&src, &mut t);
        // ST9 keeps implied swapping and stores from the right, which
        // lands back on the logical sequence here.
        assert_eq!(t.dest, src);
    }

    #[test]
    fn maps_and_markers() {
        let mut t = bdx(StringType::ST4, StringType::ST5);
        t.insert_markers = true;
        t.src_to_dst_map_required = true;
        t.dst_to_src_map_required = true;
        t.property_map_required = true;
        let src = s(&['a', ' ', G, B, A]);
        transform(&src, &mut t);
        assert!(t.out_count > t.inp_count);
        assert_eq!(t.dst_to_src_map.len(), t.out_count);
        assert!(t.dst_to_src_map.iter().any(|&i| i == -1));
        for (i, &j) in t.src_to_dst_map.iter().enumerate() {
            assert!(j >= 0);
            assert_eq!(t.dst_to_src_map[j as usize], i as i32);
        }
        assert_eq!(t.property_map, vec![0x80, 0x80, 0x81, 0x81, 0x81]);

        let logical = t.dest.clone();
        let mut back = bdx(StringType::ST5, StringType::ST4);
        back.remove_markers = true;
        back.src_to_dst_map_required = true;
        transform(&logical, &mut back);
        assert_eq!(back.dest, src);
        assert!(back.src_to_dst_map.iter().any(|&j| j == -1));
    }

    #[test]
    fn lines_reorder_separately() {
        let mut t = bdx(StringType::ST6, StringType::ST8);
        let src = s(&[A, B, '\n', 'x', 'y']);
        transform(&src, &mut t);
        // Each line keeps its place; only the letters inside move.
        assert_eq!(t.dest.chars().nth(2), Some('\n'));
        let mut back = bdx(StringType::ST8, StringType::ST6);
        transform(&t.dest, &mut back);
        assert_eq!(back.dest, src);
    }

    #[test]
    fn no_markers_for_plain_ltr() {
        let mut t = bdx(StringType::ST4, StringType::ST5);
        t.insert_markers = true;
        transform("hello 42", &mut t);
        assert_eq!(t.dest, "hello 42");
    }

    #[test]
    fn destination_not_required() {
        let mut t = bdx(StringType::ST5, StringType::ST4);
        t.destination_required = false;
        transform("abc", &mut t);
        assert_eq!(t.dest, "");
        assert_eq!(t.out_count, 3);
    }

    #[test]
    fn implicit_to_implicit_orientation_change() {
        let src = s(&['a', 'b', ' ', A, B]);
        let mut t = bdx(StringType::ST5, StringType::ST6);
        t.insert_markers = true;
        transform(&src, &mut t);
        // Laid out under RTL, the text must still display "ab BA".
        let mut check = bdx(StringType::ST6, StringType::ST4);
        check.remove_markers = true;
        transform(&t.dest, &mut check);
        let mut direct = bdx(StringType::ST5, StringType::ST4);
        transform(&src, &mut direct);
        assert_eq!(check.dest, direct.dest);

        let mut off = bdx(StringType::ST5, StringType::ST6);
        off.imp_to_imp = false;
        transform(&src, &mut off);
        assert_eq!(off.dest, src);
    }

    #[test]
    fn contextual_orientation_follows_text() {
        let mut t = bdx(StringType::ST10, StringType::ST4);
        transform(&s(&[A, ' ', 'a']), &mut t);
        assert_eq!(t.paragraph_level(), Some(1));
        assert_eq!(t.dest, s(&['a', ' ', A]));

        t.continuation = true;
        transform("b", &mut t);
        assert_eq!(t.paragraph_level(), Some(1));
        t.continuation = false;
        transform("b", &mut t);
        assert_eq!(t.paragraph_level(), Some(0));
    }

    #[test]
    fn round_trip_keeps_digits_apart() {
        // "1-2" is one European number unless digits count as Arabic
        // numbers, where the hyphen no longer joins them.
        let src = s(&[A, ' ', '1', '-', '2']);
        let mut t = bdx(StringType::ST5, StringType::ST4);
        transform(&src, &mut t);
        assert_eq!(t.dest, s(&['1', '-', '2', ' ', A]));

        t.round_trip = true;
        transform(&src, &mut t);
        assert_eq!(t.dest, s(&['2', '-', '1', ' ', A]));
    }

    #[test]
    fn win_compatible_separators_are_neutral() {
        let src = s(&[A, ' ', '1', ',', '2']);
        let mut t = bdx(StringType::ST5, StringType::ST4);
        transform(&src, &mut t);
        assert_eq!(t.dest, s(&['1', ',', '2', ' ', A]));

        t.win_compatible = true;
        transform(&src, &mut t);
        assert_eq!(t.dest, s(&['2', ',', '1', ' ', A]));
    }

    #[test]
    fn numerals_follow_destination_flags() {
        let beh = '\u{628}';
        let plain = flags_for(StringType::ST5).unwrap();
        let mut contextual = plain;
        contextual.numerals = Numerals::Contextual;
        let src = s(&[beh, '1', ' ', '2']);

        let mut t = BidiTransform::new(plain, contextual);
        transform(&src, &mut t);
        assert_eq!(t.dest, s(&[beh, '\u{661}', ' ', '\u{662}']));

        t.word_break = true;
        transform(&src, &mut t);
        assert_eq!(t.dest, s(&[beh, '\u{661}', ' ', '2']));

        let mut national = plain;
        national.numerals = Numerals::National;
        let mut t = BidiTransform::new(plain, national);
        transform("a1", &mut t);
        assert_eq!(t.dest, "a\u{661}");
        let mut back = BidiTransform::new(national, plain);
        transform(&t.dest, &mut back);
        assert_eq!(back.dest, "a1");

        // Same numeral style on both sides leaves digits alone.
        let mut same = BidiTransform::new(plain, plain);
        transform("\u{661}", &mut same);
        assert_eq!(same.dest, "\u{661}");
    }

    #[test]
    fn contextual_visual_output_follows_first_strong() {
        // The logical text starts right to left, so its display is stored
        // from the right edge.
        let mut t = bdx(StringType::ST5, StringType::ST7);
        transform(&s(&[A, B, ' ', 'c']), &mut t);
        assert_eq!(t.dest, s(&['c', ' ', A, B]));

        let mut t = bdx(StringType::ST5, StringType::ST7);
        transform(&s(&['c', ' ', A, B]), &mut t);
        assert_eq!(t.dest, s(&['c', ' ', B, A]));
    }

    #[test]
    fn shaping_between_types() {
        let beh = '\u{628}';
        let mut t = bdx(StringType::ST5, StringType::ST4);
        transform(&s(&[beh, beh]), &mut t);
        // Logical initial+final, then reversed for display.
        assert_eq!(t.dest, "\u{FE90}\u{FE91}");

        let mut back = bdx(StringType::ST4, StringType::ST5);
        transform(&t.dest, &mut back);
        assert_eq!(back.dest, s(&[beh, beh]));
    }
}
