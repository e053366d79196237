//! Fargate task sizes
//!
//! Fargate only accepts specific CPU/memory pairs; anything else is rejected
//! by ECS at deploy time, so it is checked up front.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskSizeError {
    #[error("Unsupported Fargate CPU value {0}; expected one of 256, 512, 1024, 2048, 4096, 8192, 16384")]
    UnsupportedCpu(u32),

    #[error("Memory {memory} MiB is not valid with {cpu} CPU units; allowed: {allowed}")]
    UnsupportedMemory {
        cpu: u32,
        memory: u32,
        allowed: String,
    },
}

/// (cpu units, min memory, max memory, memory step), all memory in MiB
const TASK_SIZES: &[(u32, u32, u32, u32)] = &[
    (256, 512, 2048, 0),
    (512, 1024, 4096, 1024),
    (1024, 2048, 8192, 1024),
    (2048, 4096, 16384, 1024),
    (4096, 8192, 30720, 1024),
    (8192, 16384, 61440, 4096),
    (16384, 32768, 122880, 8192),
];

/// Memory values (MiB) allowed for the given CPU units
pub fn allowed_memory(cpu: u32) -> Option<Vec<u32>> {
    let &(_, min, max, step) = TASK_SIZES.iter().find(|(c, ..)| *c == cpu)?;
    if step == 0 {
        // 0.25 vCPU is the one irregular row
        return Some(vec![512, 1024, 2048]);
    }
    Some((min..=max).step_by(step as usize).collect())
}

pub fn validate_task_size(cpu: u32, memory: u32) -> Result<(), TaskSizeError> {
    let allowed = allowed_memory(cpu).ok_or(TaskSizeError::UnsupportedCpu(cpu))?;
    if allowed.contains(&memory) {
        return Ok(());
    }
    Err(TaskSizeError::UnsupportedMemory {
        cpu,
        memory,
        allowed: allowed
            .iter()
            .map(|m| m.to_string())
            .collect::<Vec<_>>()
            .join(", "),
    })
}
