// Linux-specific helpers: /etc/os-release and the running kernel release.

/// Distro name from /etc/os-release; PRETTY_NAME first, then NAME.
pub(super) fn read_os_name_linux() -> Option<String> {
    let content = std::fs::read_to_string("/etc/os-release").ok()?;
    parse_os_release(&content)
}

pub(super) fn parse_os_release(content: &str) -> Option<String> {
    ["PRETTY_NAME=", "NAME="].iter().find_map(|key| {
        content
            .lines()
            .find_map(|line| line.strip_prefix(key))
            .map(|v| v.trim().trim_matches('"'))
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    })
}

/// Kernel release from /proc/sys/kernel/osrelease when sysinfo has none.
pub(super) fn read_kernel_release_linux() -> Option<String> {
    let v = std::fs::read_to_string("/proc/sys/kernel/osrelease").ok()?;
    let v = v.trim();
    if v.is_empty() {
        return None;
    }
    Some(v.to_string())
}
