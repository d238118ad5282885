use serde::{Deserialize, Serialize};
use std::fmt;

/// Languages the app ships strings for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Hi,
    Mr,
    Ta,
    Te,
    Kn,
    Gu,
    Pa,
    Bn,
}

impl Language {
    pub const ALL: [Language; 9] = [
        Language::En,
        Language::Hi,
        Language::Mr,
        Language::Ta,
        Language::Te,
        Language::Kn,
        Language::Gu,
        Language::Pa,
        Language::Bn,
    ];

    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Hi => "hi",
            Self::Mr => "mr",
            Self::Ta => "ta",
            Self::Te => "te",
            Self::Kn => "kn",
            Self::Gu => "gu",
            Self::Pa => "pa",
            Self::Bn => "bn",
        }
    }

    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|lang| lang.code() == code)
    }

    #[must_use]
    pub const fn english_name(self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Hi => "Hindi",
            Self::Mr => "Marathi",
            Self::Ta => "Tamil",
            Self::Te => "Telugu",
            Self::Kn => "Kannada",
            Self::Gu => "Gujarati",
            Self::Pa => "Punjabi",
            Self::Bn => "Bengali",
        }
    }

    #[must_use]
    pub const fn native_name(self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Hi => "हिन्दी",
            Self::Mr => "मराठी",
            Self::Ta => "தமிழ்",
            Self::Te => "తెలుగు",
            Self::Kn => "ಕನ್ನಡ",
            Self::Gu => "ગુજરાતી",
            Self::Pa => "ਪੰਜਾਬੀ",
            Self::Bn => "বাংলা",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommonStrings {
    pub search: &'static str,
    pub loading: &'static str,
    pub no_data: &'static str,
    pub select_location: &'static str,
    pub retry: &'static str,
    pub clear_location: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationStrings {
    pub select_state: &'static str,
    pub select_district: &'static str,
    pub select_taluka: &'static str,
    pub select_village: &'static str,
    pub use_current_location: &'static str,
    pub location_permission: &'static str,
    pub location_detected: &'static str,
    pub state: &'static str,
    pub district: &'static str,
    pub taluka: &'static str,
}

/// UI strings for one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationTable {
    pub language: Language,
    pub common: CommonStrings,
    pub location: LocationStrings,
}

static EN: TranslationTable = TranslationTable {
    language: Language::En,
    common: CommonStrings {
        search: "Search",
        loading: "Loading...",
        no_data: "No data found",
        select_location: "Select Location",
        retry: "Retry",
        clear_location: "Clear Location",
    },
    location: LocationStrings {
        select_state: "Select State",
        select_district: "Select District",
        select_taluka: "Select Taluka",
        select_village: "Select Village",
        use_current_location: "Use Current Location",
        location_permission: "Please allow location access",
        location_detected: "Location detected via GPS",
        state: "State",
        district: "District",
        taluka: "Taluka",
    },
};

static HI: TranslationTable = TranslationTable {
    language: Language::Hi,
    common: CommonStrings {
        search: "खोजें",
        loading: "लोड हो रहा है...",
        no_data: "कोई डेटा नहीं मिला",
        select_location: "स्थान चुनें",
        retry: "पुनः प्रयास करें",
        clear_location: "स्थान साफ़ करें",
    },
    location: LocationStrings {
        select_state: "राज्य चुनें",
        select_district: "जिला चुनें",
        select_taluka: "तालुका चुनें",
        select_village: "गाँव चुनें",
        use_current_location: "वर्तमान स्थान का उपयोग करें",
        location_permission: "कृपया स्थान की अनुमति दें",
        location_detected: "GPS द्वारा स्थान का पता चला",
        state: "राज्य",
        district: "जिला",
        taluka: "तालुका",
    },
};

static MR: TranslationTable = TranslationTable {
    language: Language::Mr,
    common: CommonStrings {
        search: "शोधा",
        loading: "लोड होत आहे...",
        no_data: "माहिती आढळली नाही",
        select_location: "स्थान निवडा",
        retry: "पुन्हा प्रयत्न करा",
        clear_location: "स्थान साफ करा",
    },
    location: LocationStrings {
        select_state: "राज्य निवडा",
        select_district: "जिल्हा निवडा",
        select_taluka: "तालुका निवडा",
        select_village: "गाव निवडा",
        use_current_location: "सध्याचे स्थान वापरा",
        location_permission: "कृपया स्थान परवानगी द्या",
        location_detected: "GPS द्वारे स्थान आढळले",
        state: "राज्य",
        district: "जिल्हा",
        taluka: "तालुका",
    },
};

/// Strings for `language`. Languages without their own table use English.
#[must_use]
pub fn translations(language: Language) -> &'static TranslationTable {
    match language {
        Language::Hi => &HI,
        Language::Mr => &MR,
        Language::En
        | Language::Ta
        | Language::Te
        | Language::Kn
        | Language::Gu
        | Language::Pa
        | Language::Bn => &EN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for lang in Language::ALL {
            assert_eq!(Language::from_code(lang.code()), Some(lang));
            assert_eq!(lang.to_string(), lang.code());
        }
    }

    #[test]
    fn rejects_unknown_and_empty_codes() {
        assert_eq!(Language::from_code(""), None);
        assert_eq!(Language::from_code("fr"), None);
        assert_eq!(Language::from_code("HI"), None);
        assert_eq!(Language::from_code("xx"), None);
    }

    #[test]
    fn provider_is_total() {
        for lang in Language::ALL {
            let table = translations(lang);
            assert!(!table.common.search.is_empty());
            assert!(!table.location.select_state.is_empty());
        }
    }

    #[test]
    fn untranslated_languages_fall_back_to_english() {
        assert_eq!(translations(Language::Ta), translations(Language::En));
        assert_eq!(translations(Language::Hi).language, Language::Hi);
        assert_ne!(translations(Language::Mr), translations(Language::En));
    }

    #[test]
    fn serde_uses_lowercase_codes() {
        assert_eq!(serde_json::to_string(&Language::Kn).unwrap(), "\"kn\"");
        let lang: Language = serde_json::from_str("\"bn\"").unwrap();
        assert_eq!(lang, Language::Bn);
        assert!(serde_json::from_str::<Language>("\"xx\"").is_err());
    }
}
