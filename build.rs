use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Places config.json and the button templates next to the built executable,
/// where the tool looks for them at runtime.
fn main() {
    println!("cargo:rerun-if-changed=config.json");
    println!("cargo:rerun-if-changed=resources/buttons");

    let Some(target) = exe_dir() else {
        println!("cargo:warning=could not resolve the output directory; runtime files not copied");
        return;
    };

    let _ = fs::copy("config.json", target.join("config.json"));

    let buttons = target.join("resources").join("buttons");
    if let Ok(entries) = fs::read_dir("resources/buttons") {
        let _ = fs::create_dir_all(&buttons);
        for path in entries.flatten().map(|e| e.path()).filter(|p| p.is_file()) {
            if let Some(name) = path.file_name() {
                let _ = fs::copy(&path, buttons.join(name));
            }
        }
    }
}

/// target/<profile> from OUT_DIR (target/<profile>/build/<pkg>-<hash>/out).
fn exe_dir() -> Option<PathBuf> {
    let out_dir = env::var("OUT_DIR").ok()?;
    Path::new(&out_dir).ancestors().nth(3).map(Path::to_path_buf)
}
