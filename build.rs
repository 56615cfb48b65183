fn main() {
    // Release builds set WORKTASK_VERSION; otherwise derive it from git.
    if let Ok(version) = std::env::var("WORKTASK_VERSION") {
        println!("cargo:rustc-env=WORKTASK_VERSION={version}");
    } else {
        let hash = std::process::Command::new("git")
            .args(["rev-parse", "--short=7", "HEAD"])
            .output()
            .ok()
            .filter(|o| o.status.success())
            .and_then(|o| String::from_utf8(o.stdout).ok())
            .unwrap_or_default()
            .trim()
            .to_string();

        if hash.is_empty() {
            println!("cargo:rustc-env=WORKTASK_VERSION=dev");
        } else {
            println!("cargo:rustc-env=WORKTASK_VERSION=version-{hash}");
        }
    }
    println!("cargo:rerun-if-env-changed=WORKTASK_VERSION");
}
