//! Build script for the backrooms server
//!
//! Embeds the git revision, build time, target and profile so `version`
//! and the startup log can report exactly what is running.

use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");
    println!("cargo:rerun-if-changed=config/personas.toml");
    println!("cargo:rerun-if-changed=config/content.toml");

    let git_hash = git(&["rev-parse", "--short=8", "HEAD"]).unwrap_or_else(|| "unknown".into());
    let git_dirty = git(&["status", "--porcelain"])
        .map(|out| if out.is_empty() { "false" } else { "true" })
        .unwrap_or("unknown");

    let build_timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();
    let target = env::var("TARGET").unwrap_or_else(|_| "unknown".to_string());
    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=BACKROOMS_GIT_HASH={}", git_hash);
    println!("cargo:rustc-env=BACKROOMS_GIT_DIRTY={}", git_dirty);
    println!("cargo:rustc-env=BACKROOMS_BUILD_TIMESTAMP={}", build_timestamp);
    println!("cargo:rustc-env=BACKROOMS_TARGET={}", target);
    println!("cargo:rustc-env=BACKROOMS_PROFILE={}", profile);
}

/// Run a git command and return its trimmed stdout, if it succeeded
fn git(args: &[&str]) -> Option<String> {
    Command::new("git")
        .args(args)
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
}
