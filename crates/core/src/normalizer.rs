use serde::{Deserialize, Serialize};
use unicode_bidi::BidiInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Script {
    Arabic,
    Other,
}

const ARABIC_RANGES: [(char, char); 5] = [
    ('\u{0600}', '\u{06FF}'),
    ('\u{0750}', '\u{077F}'),
    ('\u{08A0}', '\u{08FF}'),
    ('\u{FB50}', '\u{FDFF}'),
    ('\u{FE70}', '\u{FEFF}'),
];

fn is_arabic_char(ch: char) -> bool {
    ARABIC_RANGES
        .iter()
        .any(|(start, end)| (*start..=*end).contains(&ch))
}

/// Returns `Arabic` as soon as one code point falls in an Arabic block.
pub fn detect_script(text: &str) -> Script {
    if text.chars().any(is_arabic_char) {
        Script::Arabic
    } else {
        Script::Other
    }
}

pub fn clean(text: &str) -> String {
    text.split_whitespace()
        .map(|word| word.replace(['\u{200E}', '\u{200F}'], ""))
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn reshape_for_display(text: &str) -> String {
    let shaped = shape_arabic(text);
    let bidi = BidiInfo::new(&shaped, None);

    let mut display = String::with_capacity(shaped.len());
    for paragraph in &bidi.paragraphs {
        let line = paragraph.range.clone();
        display.push_str(&bidi.reorder_line(paragraph, line));
    }
    display
}

#[derive(Debug, Clone, Copy)]
struct Forms {
    isolated: char,
    final_: char,
    initial: Option<char>,
    medial: Option<char>,
}

impl Forms {
    const fn dual(isolated: u32) -> Self {
        Self {
            isolated: to_char(isolated),
            final_: to_char(isolated + 1),
            initial: Some(to_char(isolated + 2)),
            medial: Some(to_char(isolated + 3)),
        }
    }

    const fn right(isolated: u32) -> Self {
        Self {
            isolated: to_char(isolated),
            final_: to_char(isolated + 1),
            initial: None,
            medial: None,
        }
    }

    const fn joins_forward(&self) -> bool {
        self.initial.is_some()
    }
}

const fn to_char(code: u32) -> char {
    match char::from_u32(code) {
        Some(ch) => ch,
        None => '\u{FFFD}',
    }
}

const TATWEEL: char = '\u{0640}';
const LAM: char = '\u{0644}';

fn forms(ch: char) -> Option<Forms> {
    let forms = match ch {
        '\u{0621}' => Forms {
            isolated: '\u{FE80}',
            final_: '\u{FE80}',
            initial: None,
            medial: None,
        },
        '\u{0622}' => Forms::right(0xFE81),
        '\u{0623}' => Forms::right(0xFE83),
        '\u{0624}' => Forms::right(0xFE85),
        '\u{0625}' => Forms::right(0xFE87),
        '\u{0626}' => Forms::dual(0xFE89),
        '\u{0627}' => Forms::right(0xFE8D),
        '\u{0628}' => Forms::dual(0xFE8F),
        '\u{0629}' => Forms::right(0xFE93),
        '\u{062A}' => Forms::dual(0xFE95),
        '\u{062B}' => Forms::dual(0xFE99),
        '\u{062C}' => Forms::dual(0xFE9D),
        '\u{062D}' => Forms::dual(0xFEA1),
        '\u{062E}' => Forms::dual(0xFEA5),
        '\u{062F}' => Forms::right(0xFEA9),
        '\u{0630}' => Forms::right(0xFEAB),
        '\u{0631}' => Forms::right(0xFEAD),
        '\u{0632}' => Forms::right(0xFEAF),
        '\u{0633}' => Forms::dual(0xFEB1),
        '\u{0634}' => Forms::dual(0xFEB5),
        '\u{0635}' => Forms::dual(0xFEB9),
        '\u{0636}' => Forms::dual(0xFEBD),
        '\u{0637}' => Forms::dual(0xFEC1),
        '\u{0638}' => Forms::dual(0xFEC5),
        '\u{0639}' => Forms::dual(0xFEC9),
        '\u{063A}' => Forms::dual(0xFECD),
        '\u{0641}' => Forms::dual(0xFED1),
        '\u{0642}' => Forms::dual(0xFED5),
        '\u{0643}' => Forms::dual(0xFED9),
        '\u{0644}' => Forms::dual(0xFEDD),
        '\u{0645}' => Forms::dual(0xFEE1),
        '\u{0646}' => Forms::dual(0xFEE5),
        '\u{0647}' => Forms::dual(0xFEE9),
        '\u{0648}' => Forms::right(0xFEED),
        '\u{0649}' => Forms::right(0xFEEF),
        '\u{064A}' => Forms::dual(0xFEF1),
        '\u{067E}' => Forms::dual(0xFB56),
        '\u{0686}' => Forms::dual(0xFB7A),
        '\u{0698}' => Forms::right(0xFB8A),
        '\u{06A9}' => Forms::dual(0xFB8E),
        '\u{06AF}' => Forms::dual(0xFB92),
        '\u{06CC}' => Forms::dual(0xFBFC),
        _ => return None,
    };
    Some(forms)
}

fn lam_alef(alef: char) -> Option<(char, char)> {
    match alef {
        '\u{0622}' => Some(('\u{FEF5}', '\u{FEF6}')),
        '\u{0623}' => Some(('\u{FEF7}', '\u{FEF8}')),
        '\u{0625}' => Some(('\u{FEF9}', '\u{FEFA}')),
        '\u{0627}' => Some(('\u{FEFB}', '\u{FEFC}')),
        _ => None,
    }
}

fn is_transparent(ch: char) -> bool {
    matches!(ch, '\u{0610}'..='\u{061A}' | '\u{064B}'..='\u{065F}' | '\u{0670}' | '\u{06D6}'..='\u{06ED}')
}

fn joins_forward(ch: char) -> bool {
    ch == TATWEEL || forms(ch).is_some_and(|forms| forms.joins_forward())
}

fn joins_backward(ch: char) -> bool {
    ch == TATWEEL || forms(ch).is_some_and(|forms| forms.final_ != forms.isolated)
}

fn neighbor(chars: &[char], mut index: usize, forward: bool) -> Option<(usize, char)> {
    loop {
        index = if forward {
            index.checked_add(1).filter(|next| *next < chars.len())?
        } else {
            index.checked_sub(1)?
        };
        if !is_transparent(chars[index]) {
            return Some((index, chars[index]));
        }
    }
}

fn shape_arabic(text: &str) -> String {
    let chars = text.chars().collect::<Vec<_>>();
    let mut consumed = vec![false; chars.len()];
    let mut shaped = String::with_capacity(text.len());

    for (index, &ch) in chars.iter().enumerate() {
        if consumed[index] {
            continue;
        }
        let Some(forms) = forms(ch) else {
            shaped.push(ch);
            continue;
        };

        let joined_before = neighbor(&chars, index, false)
            .is_some_and(|(_, previous)| joins_forward(previous) && joins_backward(ch));
        let next = neighbor(&chars, index, true);

        if ch == LAM {
            if let Some((ligature, next_index)) =
                next.and_then(|(at, alef)| lam_alef(alef).map(|forms| (forms, at)))
            {
                consumed[next_index] = true;
                shaped.push(if joined_before { ligature.1 } else { ligature.0 });
                continue;
            }
        }

        let joined_after =
            forms.joins_forward() && next.is_some_and(|(_, following)| joins_backward(following));

        let glyph = match (joined_before, joined_after) {
            (true, true) => forms.medial.unwrap_or(forms.final_),
            (true, false) => forms.final_,
            (false, true) => forms.initial.unwrap_or(forms.isolated),
            (false, false) => forms.isolated,
        };
        shaped.push(glyph);
    }

    shaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(text: &str) -> Vec<u32> {
        text.chars().map(|ch| ch as u32).collect()
    }

    #[test]
    fn arabic_is_detected_in_every_block() {
        assert_eq!(detect_script("مرحبا"), Script::Arabic);
        assert_eq!(detect_script("\u{0750}"), Script::Arabic);
        assert_eq!(detect_script("\u{08A0}"), Script::Arabic);
        assert_eq!(detect_script("\u{FB50}"), Script::Arabic);
        assert_eq!(detect_script("\u{FEFB}"), Script::Arabic);
    }

    #[test]
    fn latin_and_blank_text_is_other() {
        assert_eq!(detect_script("Hydraulic pressure"), Script::Other);
        assert_eq!(detect_script(""), Script::Other);
        assert_eq!(detect_script("   \n\t"), Script::Other);
    }

    #[test]
    fn one_stray_arabic_mark_flips_classification() {
        assert_eq!(detect_script("plain english\u{064B}"), Script::Arabic);
    }

    #[test]
    fn clean_strips_direction_marks_and_collapses_whitespace() {
        assert_eq!(clean("  \u{200F}مرحبا\u{200E}   world\n\t again "), "مرحبا world again");
        assert_eq!(clean(""), "");
        assert_eq!(clean("\u{200E} \u{200F}"), "");
    }

    #[test]
    fn clean_is_idempotent() {
        let samples = [
            "  a  b ",
            "\u{200F} \u{200E}x\u{200F}y ",
            "نص  عربي\n\nmixed text",
            "",
        ];
        for sample in samples {
            let once = clean(sample);
            assert_eq!(clean(&once), once);
        }
    }

    #[test]
    fn letters_take_contextual_forms_in_visual_order() {
        // beh yeh teh: initial, medial, final; displayed right to left.
        let display = reshape_for_display("بيت");
        assert_eq!(codes(&display), vec![0xFE96, 0xFEF4, 0xFE91]);
    }

    #[test]
    fn lam_alef_becomes_a_ligature() {
        // seen, lam+alef joined to seen, meem isolated after the non-joining alef.
        let display = reshape_for_display("سلام");
        assert_eq!(codes(&display), vec![0xFEE1, 0xFEFC, 0xFEB3]);
    }

    #[test]
    fn right_joining_letters_break_the_join() {
        // dal never connects forward, so the following reh stands alone.
        let display = reshape_for_display("در");
        assert_eq!(codes(&display), vec![0xFEAD, 0xFEA9]);
    }

    #[test]
    fn harakat_do_not_break_joining() {
        let shaped = shape_arabic("بَت");
        assert_eq!(codes(&shaped), vec![0xFE91, 0x064E, 0xFE96]);
    }

    #[test]
    fn latin_prefix_stays_in_reading_order() {
        let display = reshape_for_display("abc بيت");
        assert!(display.starts_with("abc "));
        assert!(display.ends_with('\u{FE91}'));
    }

    #[test]
    fn reshaped_arabic_stays_arabic() {
        for sample in ["مرحبا بالعالم", "سلام", "العدد 42 فقط", "\u{064B}x"] {
            assert_eq!(detect_script(sample), Script::Arabic);
            let display = reshape_for_display(sample);
            assert_eq!(detect_script(&display), Script::Arabic);
            assert_eq!(reshape_for_display(sample), display);
        }
    }
}
