//! Hard-coded demo data: the device table and the prophecy cards.

use crate::sort::{FieldValue, Sortable};
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Device lists longer than this start collapsed in the card view.
pub const MAX_VISIBLE_DEVICES: usize = 3;

const NAME_PREFIX: &str = "NXT-";
const NAME_SUFFIX_LEN: usize = 10;
const NAME_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// One row of the device table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRisk {
    pub name: String,
    #[serde(rename = "failureProbability")]
    pub failure_probability: f64,
}

impl Sortable for DeviceRisk {
    fn field(&self, field: &str) -> Option<FieldValue<'_>> {
        match field {
            "name" => Some(FieldValue::Text(&self.name)),
            "failureProbability" => Some(FieldValue::Number(self.failure_probability)),
            _ => None,
        }
    }
}

/// A predicted failure cause, the devices exposed to it and the suggested fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prophecy {
    pub names: Vec<String>,
    #[serde(rename = "scriptName")]
    pub script_name: String,
    #[serde(rename = "failureDetails")]
    pub failure_details: String,
    #[serde(rename = "raSuggested")]
    pub ra_suggested: String,
}

impl Prophecy {
    /// Identifier used for actions launched from this card.
    pub fn action_id(&self) -> &str {
        if self.script_name.is_empty() {
            &self.ra_suggested
        } else {
            &self.script_name
        }
    }
}

impl Sortable for Prophecy {
    fn field(&self, field: &str) -> Option<FieldValue<'_>> {
        match field {
            "names.length" => Some(FieldValue::Count(self.names.len())),
            "scriptName" => Some(FieldValue::Text(&self.script_name)),
            "failureDetails" => Some(FieldValue::Text(&self.failure_details)),
            "raSuggested" => Some(FieldValue::Text(&self.ra_suggested)),
            _ => None,
        }
    }
}

pub const DEVICE_FIELDS: &[&str] = &["name", "failureProbability"];
pub const PROPHECY_FIELDS: &[&str] = &["names.length", "scriptName", "failureDetails", "raSuggested"];

/// Title of the remote action offered on every device table row.
pub const TABLE_ACTION: &str = "Update the collector to version 24.10";

const DEVICE_TABLE: &[(&str, f64)] = &[
    ("NXT-PXWX0M3YYK", 98.2),
    ("NXT-GM036DJX", 85.4),
    ("NXT-MDJ49PXQGL", 92.1),
    ("NXT-L2KH4C14JF", 90.3),
    ("NXT-5CG141BRV9", 88.7),
    ("NXT-P7WHWFWVX3", 93.5),
    ("NXT-FXJ905201H", 94.0),
    ("NXT-5CG1251ZKZ", 87.6),
    ("NXT-GM0A1S7L", 86.9),
    ("NXT-NVJ0LV72QW", 91.2),
    ("NXT-PC0XRE68", 84.3),
];

struct ProphecySeed {
    devices: usize,
    script_name: &'static str,
    failure_details: &'static str,
    ra_suggested: &'static str,
}

const PROPHECIES: &[ProphecySeed] = &[
    ProphecySeed {
        devices: 300,
        script_name: "CheckOSCompatibility.ps1",
        failure_details: "Windows 10 Version 1809 is installed, but the device has drivers designed for Windows 11, leading to incompatibilities.",
        ra_suggested: "This script checks if the operating system version installed is compatible with the device's drivers. It compares the OS version against known compatibility lists for hardware drivers",
    },
    ProphecySeed {
        devices: 200,
        script_name: "",
        failure_details: "An NVIDIA GeForce GTX 1080 Ti has an outdated driver version 452.06 which causes graphical glitches in games or crashes in video editing software.",
        ra_suggested: "This script checks the installed GPU driver version against the latest available driver from the manufacturer and ensures there are no driver corruption issues. If outdated, it updates or reinstalls the GPU driver.",
    },
    ProphecySeed {
        devices: 100,
        script_name: "",
        failure_details: "Windows 11 (22H2) is installed but the system is using an outdated printer driver from 2019, which is causing crashes in printing applications",
        ra_suggested: "This script compares the device's drivers against the latest operating system updates and identifies any conflicts or incompatibilities that could cause system instability. It also downloads the latest compatible drivers.",
    },
    ProphecySeed {
        devices: 4,
        script_name: "",
        failure_details: "Seagate Barracuda 2TB HDD starts throwing I/O errors or shows significant performance degradation, leading to slow system startup and file access.",
        ra_suggested: "This Remote Action performs SMART (Self-Monitoring, Analysis, and Reporting Technology) checks on the hard disk and identifies any potential health issues such as read/write errors or bad sectors that could lead to crashes",
    },
    ProphecySeed {
        devices: 2,
        script_name: "",
        failure_details: "The system has mismatched RAM sticks 8GB DDR4 2133MHz and 16GB DDR4 2666MHz causing memory errors or instability.",
        ra_suggested: "This script analyzes the memory configuration, including the total amount of installed RAM, the speed of each module, and whether mismatched RAM sticks are installed, which could lead to system instability or poor performance",
    },
];

/// Generate `count` random device names of the form `NXT-XXXXXXXXXX`.
pub fn generate_devices<R: Rng>(rng: &mut R, count: usize) -> Vec<String> {
    (0..count)
        .map(|_| {
            let suffix: String = (0..NAME_SUFFIX_LEN)
                .map(|_| NAME_ALPHABET[rng.gen_range(0..NAME_ALPHABET.len())] as char)
                .collect();
            format!("{NAME_PREFIX}{suffix}")
        })
        .collect()
}

pub fn device_table() -> Vec<DeviceRisk> {
    DEVICE_TABLE
        .iter()
        .map(|(name, p)| DeviceRisk {
            name: (*name).to_string(),
            failure_probability: *p,
        })
        .collect()
}

/// Build the prophecy cards. A seed makes the generated device names
/// reproducible.
pub fn prophecies(seed: Option<u64>) -> Vec<Prophecy> {
    let mut rng = match seed {
        Some(s) => rand::rngs::StdRng::seed_from_u64(s),
        None => rand::rngs::StdRng::from_entropy(),
    };
    PROPHECIES
        .iter()
        .map(|p| Prophecy {
            names: generate_devices(&mut rng, p.devices),
            script_name: p.script_name.to_string(),
            failure_details: p.failure_details.to_string(),
            ra_suggested: p.ra_suggested.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::{reorder, SortDescriptor};

    #[test]
    fn generated_names_have_expected_shape() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let names = generate_devices(&mut rng, 25);
        assert_eq!(names.len(), 25);
        for n in &names {
            let suffix = n.strip_prefix("NXT-").expect("prefix");
            assert_eq!(suffix.len(), 10);
            assert!(suffix
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()));
        }
    }

    #[test]
    fn seeded_prophecies_are_reproducible() {
        assert_eq!(prophecies(Some(42)), prophecies(Some(42)));
        let counts: Vec<usize> = prophecies(Some(1)).iter().map(|p| p.names.len()).collect();
        assert_eq!(counts, vec![300, 200, 100, 4, 2]);
    }

    #[test]
    fn table_defaults_to_highest_risk_first() {
        let sorted = reorder(&device_table(), &SortDescriptor::descending("failureProbability")).unwrap();
        assert_eq!(sorted[0].name, "NXT-PXWX0M3YYK");
        assert_eq!(sorted.last().unwrap().name, "NXT-PC0XRE68");
    }

    #[test]
    fn every_advertised_field_resolves() {
        for item in device_table() {
            for f in DEVICE_FIELDS {
                assert!(item.field(f).is_some(), "{f}");
            }
        }
        for item in prophecies(Some(3)) {
            for f in PROPHECY_FIELDS {
                assert!(item.field(f).is_some(), "{f}");
            }
        }
    }

    #[test]
    fn action_id_falls_back_to_suggestion() {
        let cards = prophecies(Some(0));
        assert_eq!(cards[0].action_id(), "CheckOSCompatibility.ps1");
        assert_eq!(cards[1].action_id(), cards[1].ra_suggested);
    }
}
