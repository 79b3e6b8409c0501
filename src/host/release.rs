// src/host/release.rs

//! Release file parsers

use super::{HostFamily, HostProfile};

/// Parse `/etc/lsb-release` `KEY=VALUE` lines
///
/// Values are trimmed but otherwise kept verbatim, quotes included.
/// Missing keys leave the matching field empty.
pub fn parse_lsb_release(content: &str) -> HostProfile {
    let mut profile = HostProfile {
        family: HostFamily::DebianLike,
        release_id: String::new(),
        release: String::new(),
        codename: String::new(),
        description: String::new(),
    };

    for line in content.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim().to_string();
        match key.trim() {
            "DISTRIB_ID" => profile.release_id = value,
            "DISTRIB_RELEASE" => profile.release = value,
            "DISTRIB_CODENAME" => profile.codename = value,
            "DISTRIB_DESCRIPTION" => profile.description = value,
            _ => {}
        }
    }

    profile
}

/// Parse the single descriptive line of `/etc/redhat-release`
///
/// `CentOS Linux release 7.3.1611 (Core)` yields id `CentOS`, release
/// `7.3.1611` (second-to-last token) and codename `CentOS7.3.1611`.
/// Returns `None` when the first non-empty line has fewer than two tokens.
pub fn parse_redhat_release(content: &str) -> Option<HostProfile> {
    let line = content.lines().map(str::trim).find(|l| !l.is_empty())?;
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 2 {
        return None;
    }

    let release_id = tokens[0].to_string();
    let release = tokens[tokens.len() - 2].to_string();
    // No separator between id and release, kept as deployed units expect it
    let codename = format!("{}{}", release_id, release);

    Some(HostProfile {
        family: HostFamily::RedhatLike,
        release_id,
        release,
        codename,
        description: line.to_string(),
    })
}

/// Whether `/etc/os-release` names a RedHat-family distribution
pub fn os_release_is_redhat(content: &str) -> bool {
    content
        .lines()
        .filter_map(|line| line.split_once('='))
        .filter(|(key, _)| matches!(key.trim(), "ID" | "ID_LIKE"))
        .flat_map(|(_, value)| value.trim().trim_matches('"').split_whitespace())
        .any(|id| matches!(id, "rhel" | "centos" | "fedora"))
}

/// Profile used when the host is RedHat-family but has no release file
pub fn centos_fallback() -> HostProfile {
    HostProfile {
        family: HostFamily::RedhatLike,
        release_id: "CentOS".to_string(),
        release: String::new(),
        codename: "CentOS".to_string(),
        description: "CentOS".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lsb_release_keeps_values_verbatim() {
        let profile = parse_lsb_release(
            "DISTRIB_ID=Ubuntu\nDISTRIB_RELEASE=16.04\nDISTRIB_CODENAME=xenial\nDISTRIB_DESCRIPTION=\"Ubuntu 16.04.2 LTS\"\n",
        );
        assert_eq!(profile.release_id, "Ubuntu");
        assert_eq!(profile.release, "16.04");
        assert_eq!(profile.codename, "xenial");
        assert_eq!(profile.description, "\"Ubuntu 16.04.2 LTS\"");
    }

    #[test]
    fn test_parse_lsb_release_skips_junk_lines() {
        let profile = parse_lsb_release("\n# comment\nDISTRIB_ID = Ubuntu \nNOT_A_PAIR\n");
        assert_eq!(profile.release_id, "Ubuntu");
        assert!(profile.codename.is_empty());
    }

    #[test]
    fn test_parse_redhat_release() {
        let profile = parse_redhat_release("CentOS Linux release 7.3.1611 (Core)\n").unwrap();
        assert_eq!(profile.release_id, "CentOS");
        assert_eq!(profile.release, "7.3.1611");
        assert_eq!(profile.codename, "CentOS7.3.1611");
        assert_eq!(profile.description, "CentOS Linux release 7.3.1611 (Core)");
    }

    #[test]
    fn test_parse_redhat_release_rhel_line() {
        let profile =
            parse_redhat_release("Red Hat Enterprise Linux Server release 7.9 (Maipo)").unwrap();
        assert_eq!(profile.release_id, "Red");
        assert_eq!(profile.release, "7.9");
        assert_eq!(profile.codename, "Red7.9");
    }

    #[test]
    fn test_parse_redhat_release_too_short() {
        assert!(parse_redhat_release("CentOS").is_none());
        assert!(parse_redhat_release("").is_none());
    }

    #[test]
    fn test_os_release_is_redhat() {
        assert!(os_release_is_redhat("ID=\"rhel\"\n"));
        assert!(os_release_is_redhat("ID=rocky\nID_LIKE=\"rhel centos fedora\"\n"));
        assert!(!os_release_is_redhat("ID=ubuntu\nID_LIKE=debian\n"));
    }
}
