//! Delivery time windows.
//!
//! Candidates either carry an explicit `[desde, hasta]` window or free-text
//! delivery notes, which are classified here. Times are minutes from midnight.

use serde::{Deserialize, Serialize};

/// Morning band used to label windows.
pub const WINDOW_AM: (u32, u32) = (9 * 60, 13 * 60);
/// Afternoon band used to label windows.
pub const WINDOW_PM: (u32, u32) = (14 * 60, 18 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    /// Customer picks the goods up; no delivery time applies.
    Retiro,
    Ventana,
    #[default]
    SinHorario,
}

/// Coarse half-day label of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Franja {
    #[serde(rename = "AM")]
    Am,
    #[serde(rename = "PM")]
    Pm,
    #[default]
    #[serde(rename = "SIN_HORARIO")]
    SinHorario,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeWindow {
    #[serde(default)]
    pub tipo: WindowKind,
    #[serde(default)]
    pub desde_min: Option<u32>,
    #[serde(default)]
    pub hasta_min: Option<u32>,
    #[serde(default)]
    pub franja: Franja,
    #[serde(default)]
    pub llamar_antes: bool,
}

impl TimeWindow {
    pub fn between(desde_min: u32, hasta_min: u32) -> Self {
        Self {
            tipo: WindowKind::Ventana,
            desde_min: Some(desde_min),
            hasta_min: Some(hasta_min),
            franja: assign_franja(desde_min, hasta_min),
            llamar_antes: false,
        }
    }

    pub fn sin_horario() -> Self {
        Self::default()
    }

    pub fn retiro() -> Self {
        Self {
            tipo: WindowKind::Retiro,
            ..Self::default()
        }
    }

    /// Bounds that actually constrain arrival, if any.
    pub fn bounds(&self) -> Option<(u32, u32)> {
        match (self.tipo, self.desde_min, self.hasta_min) {
            (WindowKind::Ventana, Some(desde), Some(hasta)) => Some((desde, hasta)),
            _ => None,
        }
    }

    /// Whether the window overlaps `[from, to)`. Unconstrained windows always do.
    pub fn intersects(&self, from: u32, to: u32) -> bool {
        match self.bounds() {
            Some((desde, hasta)) => ranges_intersect(desde, hasta, from, to),
            None => true,
        }
    }
}

pub fn ranges_intersect(a_from: u32, a_to: u32, b_from: u32, b_to: u32) -> bool {
    a_from < b_to && b_from < a_to
}

fn assign_franja(desde: u32, hasta: u32) -> Franja {
    let am = ranges_intersect(desde, hasta, WINDOW_AM.0, WINDOW_AM.1);
    let pm = ranges_intersect(desde, hasta, WINDOW_PM.0, WINDOW_PM.1);
    match (am, pm) {
        (true, false) => Franja::Am,
        (false, true) => Franja::Pm,
        _ => Franja::SinHorario,
    }
}

/// Parses `HH:MM` into minutes from midnight.
pub fn parse_hhmm(text: &str) -> Option<u32> {
    let (h, m) = text.trim().split_once(':')?;
    if h.is_empty() || h.len() > 2 || m.len() != 2 {
        return None;
    }
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    if h > 23 || m > 59 {
        return None;
    }
    Some(h * 60 + m)
}

/// Classifies free-text delivery notes.
///
/// Checked in order: pickup phrases, an explicit `HH:MM-HH:MM` range,
/// `DESDE`/`A PARTIR DE HH:MM`, `HASTA HH:MM`, vague words (`MAÑANA`,
/// `TARDE`, `HORARIO COMERCIAL`), and finally `LLAMAR ANTES`.
pub fn classify_observation(text: &str) -> TimeWindow {
    let text = text.trim().to_uppercase();
    if text.is_empty() {
        return TimeWindow::sin_horario();
    }

    if is_pickup(&text) {
        return TimeWindow::retiro();
    }

    let times = find_times(&text);

    for pair in times.windows(2) {
        let between = text[pair[0].end..pair[1].start].trim();
        if between == "-" || between == "–" {
            return TimeWindow::between(pair[0].minutes, pair[1].minutes);
        }
    }

    for time in &times {
        let before = strip_article(&text[..time.start]);
        if before.ends_with("DESDE") || before.ends_with("A PARTIR DE") {
            return TimeWindow::between(time.minutes, 23 * 60);
        }
    }

    for time in &times {
        if strip_article(&text[..time.start]).ends_with("HASTA") {
            return TimeWindow::between(0, time.minutes);
        }
    }

    let words: Vec<&str> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    if words.iter().any(|w| *w == "MAÑANA" || *w == "MANANA") {
        return TimeWindow::between(8 * 60, 13 * 60);
    }
    if words.contains(&"TARDE") {
        return TimeWindow::between(14 * 60, 21 * 60);
    }
    if contains_phrase(&words, &["HORARIO", "COMERCIAL"]) {
        return TimeWindow {
            franja: Franja::SinHorario,
            ..TimeWindow::between(9 * 60, 18 * 60)
        };
    }

    let llamar_antes = contains_phrase(&words, &["LLAMAR", "ANTES"])
        || contains_phrase(&words, &["AVISAR", "ANTES"]);

    TimeWindow {
        llamar_antes,
        ..TimeWindow::sin_horario()
    }
}

fn is_pickup(text: &str) -> bool {
    let words: Vec<&str> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    words.contains(&"RETIRA")
        || contains_phrase(&words, &["RETIRO", "CLIENTE"])
        || contains_phrase(&words, &["PASA", "A", "RETIRAR"])
}

fn contains_phrase(words: &[&str], phrase: &[&str]) -> bool {
    words.windows(phrase.len()).any(|w| w == phrase)
}

fn strip_article(prefix: &str) -> &str {
    let trimmed = prefix.trim_end();
    for article in [" LAS", " LA"] {
        if let Some(rest) = trimmed.strip_suffix(article) {
            return rest.trim_end();
        }
    }
    trimmed
}

struct TimeMatch {
    start: usize,
    end: usize,
    minutes: u32,
}

/// Finds `H:MM` / `HH:MM` tokens with their byte spans.
fn find_times(text: &str) -> Vec<TimeMatch> {
    let bytes = text.as_bytes();
    let mut found = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b':' {
            i += 1;
            continue;
        }

        let mut start = i;
        while start > 0 && bytes[start - 1].is_ascii_digit() && i - (start - 1) <= 2 {
            start -= 1;
        }
        let end = i + 3;
        let minutes_ok = end <= bytes.len()
            && bytes[i + 1].is_ascii_digit()
            && bytes[i + 2].is_ascii_digit()
            && (end == bytes.len() || !bytes[end].is_ascii_digit());

        if start < i && minutes_ok {
            if let Some(minutes) = parse_hhmm(&text[start..end]) {
                found.push(TimeMatch { start, end, minutes });
                i = end;
                continue;
            }
        }
        i += 1;
    }

    found
}
