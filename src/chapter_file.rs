//! Chapter number and title from an uploaded archive's file name.

const ARCHIVE_EXTENSIONS: [&str; 2] = [".zip", ".cbz"];
const SEPARATORS: [char; 6] = ['-', '_', '|', ':', '–', '—'];
const INDICATORS: [&str; 8] = ["ch", "chp", "chap", "chapter", "cha", "فصل", "الفصل", "c"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedChapter {
    pub number: String,
    pub title: String,
    pub original_file_name: String,
}

impl ParsedChapter {
    /// Parsed title, or a generated one when the file name had none.
    pub fn title_or(&self, manga_title: &str) -> String {
        if self.title.is_empty() {
            format!("{manga_title} - الفصل {}", self.number)
        } else {
            self.title.clone()
        }
    }
}

pub fn is_archive(file_name: &str) -> bool {
    strip_suffix_ignore_case(file_name, &ARCHIVE_EXTENSIONS).is_some()
}

pub fn parse_chapter_file_name(file_name: &str) -> ParsedChapter {
    let base = strip_suffix_ignore_case(file_name, &ARCHIVE_EXTENSIONS)
        .unwrap_or(file_name)
        .trim();

    let mut number: Option<&str> = None;
    let mut title_parts = Vec::new();

    for part in base.split(SEPARATORS).map(str::trim).filter(|p| !p.is_empty()) {
        if number.is_none() {
            if let Some((found, consumed)) = leading_number(part) {
                number = Some(found);
                let rest = part[consumed..].trim();
                if !rest.is_empty() && !is_indicator(rest) {
                    title_parts.push(rest);
                }
                continue;
            }
        }
        if !is_indicator(part) {
            title_parts.push(part);
        }
    }

    let number = number.or_else(|| first_number(base)).unwrap_or("1");

    ParsedChapter {
        number: number.to_string(),
        title: title_parts.join(" ").trim().to_string(),
        original_file_name: file_name.to_string(),
    }
}

fn strip_suffix_ignore_case<'a>(value: &'a str, suffixes: &[&str]) -> Option<&'a str> {
    suffixes.iter().find_map(|suffix| {
        let cut = value.len().checked_sub(suffix.len())?;
        if !value.is_char_boundary(cut) || !value[cut..].eq_ignore_ascii_case(suffix) {
            return None;
        }
        Some(&value[..cut])
    })
}

fn is_indicator(text: &str) -> bool {
    let text = text.trim();
    INDICATORS.iter().any(|i| text.eq_ignore_ascii_case(i))
}

/// Number at the start of `part`, optionally after an indicator. Returns
/// the number and how many bytes of `part` were consumed.
fn leading_number(part: &str) -> Option<(&str, usize)> {
    INDICATORS
        .iter()
        .copied()
        .chain(std::iter::once(""))
        .find_map(|indicator| {
            let after = indicator.len();
            if part.len() < after
                || !part.is_char_boundary(after)
                || !part[..after].eq_ignore_ascii_case(indicator)
            {
                return None;
            }

            let rest = &part[after..];
            let start = after + (rest.len() - rest.trim_start().len());
            let len = number_len(&part[start..])?;
            Some((&part[start..start + len], start + len))
        })
}

/// Length of a `\d+(\.\d+)?` match at the start of `text`.
fn number_len(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let digits = |from: usize| bytes[from..].iter().take_while(|b| b.is_ascii_digit()).count();

    let whole = digits(0);
    if whole == 0 {
        return None;
    }
    if bytes.get(whole) == Some(&b'.') {
        let fraction = digits(whole + 1);
        if fraction > 0 {
            return Some(whole + 1 + fraction);
        }
    }
    Some(whole)
}

fn first_number(text: &str) -> Option<&str> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let len = number_len(&text[start..])?;
    Some(&text[start..start + len])
}
