//! Host telemetry snapshot for prompt context.

use aish_core::SystemContext;
use sysinfo::System;

/// Capture the once-per-turn host snapshot interpolated into prompts and
/// the startup banner.
pub fn capture_context() -> SystemContext {
    let mut sys = System::new_all();
    sys.refresh_all();

    SystemContext {
        os_name: System::name().unwrap_or_else(|| "unknown".to_string()),
        os_version: System::os_version().unwrap_or_else(|| "unknown".to_string()),
        cpu_count: sys.cpus().len(),
        cpu_usage_percent: sys.global_cpu_info().cpu_usage(),
        total_memory_mb: sys.total_memory() / 1024 / 1024,
        available_memory_mb: sys.available_memory() / 1024 / 1024,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_reports_real_values() {
        let context = capture_context();
        assert!(!context.os_name.is_empty());
        assert!(context.cpu_count > 0);
        assert!(context.total_memory_mb > 0);
        assert!(context.available_memory_mb <= context.total_memory_mb);
    }

    #[test]
    fn test_capture_renders_for_prompts() {
        let rendered = capture_context().render();
        assert!(rendered.starts_with("OS: "));
        assert!(rendered.contains("cores"));
    }
}
