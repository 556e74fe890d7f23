use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");

    let pkg_version = env!("CARGO_PKG_VERSION");
    let version = match git_short_hash() {
        Some(hash) => format!("{} ({})", pkg_version, hash),
        None => pkg_version.to_string(),
    };

    println!("cargo:rustc-env=TERMINAL_PROXY_VERSION={}", version);
}

fn git_short_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8(output.stdout).ok()?;
    let hash = hash.trim();
    if hash.is_empty() {
        None
    } else {
        Some(hash.to_string())
    }
}
