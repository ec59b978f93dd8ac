use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;

/// Codes that must all carry a value before a frame is persisted.
pub const REQUIRED_CODES: [&str; 7] = ["ADCO", "OPTARIF", "ISOUSC", "IINST", "IMAX", "PAPP", "MOTDETAT"];

// Generates the typed record and the code <-> field lookups from one table.
macro_rules! linky_fields {
    ($( $field:ident => $code:literal, $doc:literal; )*) => {
        /// One meter reporting cycle: the known TIC fields plus any unrecognised codes.
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        pub struct LinkyMetrics {
            $(
                #[doc = $doc]
                pub $field: Option<String>,
            )*
            /// Codes outside the known schema, kept verbatim (firmware variants).
            pub extra: BTreeMap<String, String>,
        }

        /// Known codes in the order the meter emits them.
        pub const KNOWN_CODES: &[&str] = &[$($code),*];

        impl LinkyMetrics {
            fn slot(&self, code: &str) -> Option<&Option<String>> {
                $(
                    if code.eq_ignore_ascii_case($code) {
                        return Some(&self.$field);
                    }
                )*
                None
            }

            fn slot_mut(&mut self, code: &str) -> Option<&mut Option<String>> {
                $(
                    if code.eq_ignore_ascii_case($code) {
                        return Some(&mut self.$field);
                    }
                )*
                None
            }

            /// Known fields in schema order, `None` where unset.
            pub fn known_fields(&self) -> Vec<(&'static str, Option<&str>)> {
                vec![$(($code, self.$field.as_deref())),*]
            }
        }
    };
}

linky_fields! {
    adco => "ADCO", "Meter address";
    optarif => "OPTARIF", "Selected tariff option";
    isousc => "ISOUSC", "Subscribed current (A)";
    base => "BASE", "Base option index (Wh)";
    hchc => "HCHC", "Off-peak hours index (Wh)";
    hchp => "HCHP", "Peak hours index (Wh)";
    ejphn => "EJPHN", "EJP normal hours index (Wh)";
    ejphpm => "EJPHPM", "EJP mobile peak hours index (Wh)";
    bbrhcjb => "BBRHCJB", "Tempo blue days, off-peak index (Wh)";
    bbrhpjb => "BBRHPJB", "Tempo blue days, peak index (Wh)";
    bbrhcjw => "BBRHCJW", "Tempo white days, off-peak index (Wh)";
    bbrhpjw => "BBRHPJW", "Tempo white days, peak index (Wh)";
    bbrhcjr => "BBRHCJR", "Tempo red days, off-peak index (Wh)";
    bbrhpjr => "BBRHPJR", "Tempo red days, peak index (Wh)";
    pejp => "PEJP", "EJP start notice (min)";
    ptec => "PTEC", "Current tariff period";
    demain => "DEMAIN", "Tomorrow's Tempo colour";
    iinst => "IINST", "Instantaneous current (A)";
    adps => "ADPS", "Subscribed power overrun warning (A)";
    imax => "IMAX", "Maximum current drawn (A)";
    papp => "PAPP", "Apparent power (VA)";
    hhphc => "HHPHC", "Peak/off-peak hours schedule";
    motdetat => "MOTDETAT", "Meter status word";
}

impl LinkyMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns `value` to `code`. Known codes match case-insensitively, anything
    /// else lands in `extra` under the code as received.
    pub fn set(&mut self, code: &str, value: impl Into<String>) {
        let value = value.into();
        match self.slot_mut(code) {
            Some(slot) => *slot = Some(value),
            None => {
                self.extra.insert(code.to_string(), value);
            }
        }
    }

    pub fn get(&self, code: &str) -> Option<&str> {
        match self.slot(code) {
            Some(slot) => slot.as_deref(),
            None => self.extra.get(code).map(String::as_str),
        }
    }

    /// True when `code` holds a non-empty value.
    pub fn is_set(&self, code: &str) -> bool {
        self.get(code).map_or(false, |v| !v.is_empty())
    }

    /// Required codes that are still unset, in schema order.
    pub fn missing_required(&self) -> Vec<&'static str> {
        REQUIRED_CODES
            .iter()
            .copied()
            .filter(|code| !self.is_set(code))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_required().is_empty()
    }

    /// Back to the all-unset default, dropping any unknown codes too.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Number of fields holding a value, extras included.
    pub fn field_count(&self) -> usize {
        self.known_fields().iter().filter(|(_, v)| v.is_some()).count() + self.extra.len()
    }

    pub fn is_empty(&self) -> bool {
        self.field_count() == 0
    }
}

// Serialized as a flat map: known codes first (null when unset), then extras.
impl Serialize for LinkyMetrics {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let known = self.known_fields();
        let mut map = serializer.serialize_map(Some(known.len() + self.extra.len()))?;
        for (code, value) in known {
            map.serialize_entry(code, &value)?;
        }
        for (code, value) in &self.extra {
            map.serialize_entry(code, value)?;
        }
        map.end()
    }
}
