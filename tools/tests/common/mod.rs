//! Shared fixtures: fake search binaries and service wiring.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use delve_tools::{LocatorHints, SearchService, SearchSettings};

/// Write an executable `/bin/sh` script standing in for the search binary.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}")).expect("write fake search script");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mut perms = fs::metadata(&path).expect("metadata").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).expect("set executable bit");
    }
    path
}

/// A script that prints `fixture` verbatim and exits with `code`.
pub fn canned_output(dir: &Path, fixture: &str, code: i32) -> PathBuf {
    let data = dir.join("canned.out");
    fs::write(&data, fixture).expect("write canned output");
    write_script(
        dir,
        "fake-rg",
        &format!("cat '{}'\nexit {code}\n", data.display()),
    )
}

pub fn settings_for(binary: &Path) -> SearchSettings {
    SearchSettings {
        locator: LocatorHints {
            bundled: Some(binary.to_path_buf()),
            package_dirs: Vec::new(),
            search_path: false,
        },
        ..SearchSettings::default()
    }
}

pub fn service(binary: &Path, root: &Path) -> SearchService {
    SearchService::new(settings_for(binary), root).expect("service")
}

/// The installed ripgrep, if any. Tests that need it return early without it.
pub fn real_rg() -> Option<PathBuf> {
    which::which("rg").ok()
}

pub fn real_service(root: &Path) -> Option<SearchService> {
    let rg = real_rg()?;
    Some(service(&rg, root))
}

pub fn write_file(root: &Path, rel: &str, contents: &str) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dirs");
    }
    fs::write(&path, contents).expect("write fixture file");
    path
}

/// Render begin/match/end events for one file with the given matched lines.
pub fn file_events(path: &str, lines: &[(u64, &str)]) -> String {
    let mut out = format!("{{\"type\":\"begin\",\"data\":{{\"path\":{{\"text\":\"{path}\"}}}}}}\n");
    for (n, text) in lines {
        out.push_str(&format!(
            "{{\"type\":\"match\",\"data\":{{\"path\":{{\"text\":\"{path}\"}},\"lines\":{{\"text\":\"{text}\\n\"}},\"line_number\":{n},\"absolute_offset\":0,\"submatches\":[{{\"match\":{{\"text\":\"x\"}},\"start\":0,\"end\":1}}]}}}}\n"
        ));
    }
    out.push_str(&format!(
        "{{\"type\":\"end\",\"data\":{{\"path\":{{\"text\":\"{path}\"}},\"binary_offset\":null}}}}\n"
    ));
    out
}
