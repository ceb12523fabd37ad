/// Consultation types offered by the practice. Each one carries a fixed
/// duration and its own weekday/window rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentType {
    FirstVisit,
    InPersonFollowUp,
    VirtualFollowUp,
    Biopsy,
}

impl AppointmentType {
    /// Matches the free-text label the assistant sends back ("Primera vez",
    /// "Control presencial", ...). Case and accents are ignored; anything
    /// unrecognized falls back to an in-person follow-up.
    pub fn from_label(label: &str) -> Self {
        let t = normalize(label);
        if t.contains("primera") {
            AppointmentType::FirstVisit
        } else if t.contains("control virtual") {
            AppointmentType::VirtualFollowUp
        } else if t.contains("biopsia") {
            AppointmentType::Biopsy
        } else {
            AppointmentType::InPersonFollowUp
        }
    }

    pub fn duration_minutes(&self) -> i64 {
        match self {
            AppointmentType::FirstVisit => 20,
            AppointmentType::InPersonFollowUp => 15,
            AppointmentType::VirtualFollowUp => 10,
            AppointmentType::Biopsy => 30,
        }
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self, AppointmentType::VirtualFollowUp)
    }

    pub fn label(&self) -> &'static str {
        match self {
            AppointmentType::FirstVisit => "Primera vez",
            AppointmentType::InPersonFollowUp => "Control presencial",
            AppointmentType::VirtualFollowUp => "Control virtual",
            AppointmentType::Biopsy => "Biopsia",
        }
    }
}

/// Lowercases and strips the Spanish diacritics we expect in labels and
/// action names, so "Biopsía" and "biopsia" compare equal.
pub fn normalize(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}
