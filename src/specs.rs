use serde::{Deserialize, Serialize};
use sysinfo::System;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GpuInfo {
    pub name: String,
    pub vram_total: u64, // bytes
    pub vram_used: u64,  // bytes
    pub driver_version: Option<String>,
    pub cuda_version: Option<String>,
}

/// Snapshot of local machine resources, fetched once at startup.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HardwareCapability {
    pub os_name: String,
    pub os_version: String,
    pub cpu_model: String,
    pub cpu_cores: usize,
    pub total_memory: u64, // bytes
    pub used_memory: u64,  // bytes
    pub gpus: Vec<GpuInfo>,
}

impl HardwareCapability {
    pub fn total_vram(&self) -> u64 {
        self.gpus.iter().map(|gpu| gpu.vram_total).sum()
    }
}

/// Inspects the current machine.
///
/// GPUs are enumerated through NVML, so only NVIDIA devices are reported.
/// Without the driver library the list is empty, which callers treat as
/// "no VRAM information".
pub fn get_specs() -> crate::Result<HardwareCapability> {
    let mut sys = System::new_all();
    sys.refresh_all();

    let total_memory = sys.total_memory();
    let cpus = sys.cpus();

    if cpus.is_empty() && total_memory == 0 {
        return Err(crate::Error::SpecsUnavailable(
            "platform reported no CPUs and no memory".into(),
        ));
    }

    let specs = HardwareCapability {
        os_name: System::name().unwrap_or_else(|| "Unknown".to_string()),
        os_version: System::os_version().unwrap_or_else(|| "Unknown".to_string()),
        cpu_model: cpus
            .first()
            .map(|cpu| cpu.brand().trim().to_string())
            .unwrap_or_else(|| "Unknown CPU".to_string()),
        cpu_cores: System::physical_core_count().unwrap_or(cpus.len()),
        total_memory,
        used_memory: sys.used_memory(),
        gpus: detect_gpus(),
    };

    tracing::debug!(
        "detected {} {} / {} ({} cores, {} bytes ram, {} gpus)",
        specs.os_name,
        specs.os_version,
        specs.cpu_model,
        specs.cpu_cores,
        specs.total_memory,
        specs.gpus.len()
    );

    Ok(specs)
}

#[cfg(not(target_os = "macos"))]
fn detect_gpus() -> Vec<GpuInfo> {
    use nvml_wrapper::Nvml;

    let nvml = match Nvml::init() {
        Ok(nvml) => nvml,
        Err(e) => {
            tracing::debug!("nvml unavailable, reporting no gpus: {}", e);
            return vec![];
        }
    };

    let count = match nvml.device_count() {
        Ok(count) => count,
        Err(e) => {
            tracing::warn!("nvml device count failed: {}", e);
            return vec![];
        }
    };

    // Driver and CUDA versions are system-wide but reported per GPU.
    let driver_version = nvml.sys_driver_version().ok();
    let cuda_version = nvml.sys_cuda_driver_version().ok().map(cuda_version_string);

    (0..count)
        .filter_map(|index| match nvml.device_by_index(index) {
            Ok(device) => Some(device),
            Err(e) => {
                tracing::warn!("skipping gpu {}: {}", index, e);
                None
            }
        })
        .map(|device| {
            let (vram_total, vram_used) = device
                .memory_info()
                .map(|mem| (mem.total, mem.used))
                .unwrap_or((0, 0));

            GpuInfo {
                name: device
                    .name()
                    .unwrap_or_else(|_| "Unknown NVIDIA GPU".to_string()),
                vram_total,
                vram_used,
                driver_version: driver_version.clone(),
                cuda_version: cuda_version.clone(),
            }
        })
        .collect()
}

// No NVIDIA drivers on macOS; Metal does not expose dedicated VRAM.
#[cfg(target_os = "macos")]
fn detect_gpus() -> Vec<GpuInfo> {
    vec![]
}

/// NVML encodes the CUDA driver version as `major * 1000 + minor * 10`.
#[cfg_attr(target_os = "macos", allow(dead_code))]
fn cuda_version_string(version: i32) -> String {
    format!("{}.{}", version / 1000, (version % 1000) / 10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_specs() {
        let specs = get_specs().unwrap();
        assert!(specs.total_memory > 0);
        assert!(specs.used_memory <= specs.total_memory);
        assert!(specs.cpu_cores > 0);
        for gpu in &specs.gpus {
            assert!(gpu.vram_used <= gpu.vram_total);
        }
    }

    #[test]
    fn test_cuda_version_string() {
        assert_eq!(cuda_version_string(12040), "12.4");
        assert_eq!(cuda_version_string(11080), "11.8");
        assert_eq!(cuda_version_string(12000), "12.0");
    }

    #[test]
    fn test_total_vram_sums_all_gpus() {
        let gpu = |vram_total| GpuInfo {
            name: "gpu".into(),
            vram_total,
            vram_used: 0,
            driver_version: None,
            cuda_version: None,
        };
        let specs = HardwareCapability {
            os_name: "Linux".into(),
            os_version: "6".into(),
            cpu_model: "cpu".into(),
            cpu_cores: 8,
            total_memory: 1,
            used_memory: 0,
            gpus: vec![gpu(3), gpu(4)],
        };
        assert_eq!(specs.total_vram(), 7);
    }

    #[test]
    fn test_deserialize_backend_payload() {
        let json = r#"{
            "os_name": "Windows",
            "os_version": "11",
            "cpu_model": "Ryzen",
            "cpu_cores": 8,
            "total_memory": 17179869184,
            "used_memory": 4294967296,
            "gpus": [{"name": "RTX 3060", "vram_total": 12884901888, "vram_used": 0,
                      "driver_version": "551.23", "cuda_version": null}]
        }"#;
        let specs: HardwareCapability = serde_json::from_str(json).unwrap();
        assert_eq!(specs.gpus[0].driver_version.as_deref(), Some("551.23"));
        assert_eq!(specs.gpus[0].cuda_version, None);
    }
}
