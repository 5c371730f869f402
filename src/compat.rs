use crate::models::ModelRequirements;
use crate::specs::HardwareCapability;
use serde::Serialize;

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Verdict {
    pub compatible: bool,
    pub reason: Option<String>,
}

impl Verdict {
    fn ok() -> Self {
        Self {
            compatible: true,
            reason: None,
        }
    }

    fn rejected(reason: impl Into<String>) -> Self {
        Self {
            compatible: false,
            reason: Some(reason.into()),
        }
    }
}

/// Decides whether a model can run on the detected hardware.
///
/// VRAM is compared against the sum over every GPU, not per device.
pub fn check_compatibility(
    specs: Option<&HardwareCapability>,
    requirements: &ModelRequirements,
) -> Verdict {
    let Some(specs) = specs else {
        return Verdict::rejected("system specs not loaded");
    };

    if specs.total_memory < requirements.min_ram {
        return Verdict::rejected(format!("Requires {} RAM", format_bytes(requirements.min_ram)));
    }

    if requirements.min_vram > 0 && !specs.gpus.is_empty() {
        let total_vram = specs.total_vram();
        if total_vram > 0 && total_vram < requirements.min_vram {
            return Verdict::rejected(format!(
                "Requires {} VRAM",
                format_bytes(requirements.min_vram)
            ));
        }
    }

    Verdict::ok()
}

/// Binary (1024-based) size with two decimals, e.g. `16.00 GB`.
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{:.2} {}", value, UNITS[unit])
}
