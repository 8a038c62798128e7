use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::log;

const TESSDATA_REPO: &str = "https://github.com/tesseract-ocr/tessdata/raw/main";

#[cfg(windows)]
const TESSERACT_EXE: &str = "tesseract.exe";
#[cfg(not(windows))]
const TESSERACT_EXE: &str = "tesseract";

/// Common install locations checked after our local dir and PATH.
#[cfg(windows)]
const SYSTEM_INSTALL_DIRS: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR",
    r"C:\Program Files (x86)\Tesseract-OCR",
];
#[cfg(not(windows))]
const SYSTEM_INSTALL_DIRS: &[&str] = &["/usr/share/tesseract-ocr/5", "/usr/share/tesseract-ocr/4.00", "/usr/share"];

#[derive(Debug, Clone)]
pub struct TesseractPaths {
    pub executable: PathBuf,
    pub tessdata: PathBuf,
}

/// Returns the directory for storing Tesseract files
pub fn get_tesseract_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("quiz-autopilot")
        .join("tesseract")
}

fn traineddata_name(lang: &str) -> String {
    format!("{}.traineddata", lang)
}

/// True when `dir` holds trained data for every language.
pub fn has_all_languages(dir: &Path, languages: &[String]) -> bool {
    !languages.is_empty()
        && languages
            .iter()
            .all(|lang| dir.join(traineddata_name(lang)).exists())
}

/// Finds the Tesseract executable, checking our local dir first, then system
pub fn find_tesseract_executable() -> Result<PathBuf> {
    let local_exe = get_tesseract_dir().join(TESSERACT_EXE);
    if local_exe.exists() {
        return Ok(local_exe);
    }

    // Check PATH
    if let Ok(output) = Command::new("tesseract").arg("--version").output() {
        if output.status.success() {
            return Ok(PathBuf::from("tesseract"));
        }
    }

    for dir in SYSTEM_INSTALL_DIRS {
        let p = Path::new(dir).join(TESSERACT_EXE);
        if p.exists() {
            return Ok(p);
        }
    }

    Err(anyhow!(
        "Tesseract not found. Please install Tesseract-OCR:\n\
         1. Download from: https://github.com/UB-Mannheim/tesseract/releases\n\
         2. Run the installer (choose to add to PATH)\n\
         3. Or place {} in: {}",
        TESSERACT_EXE,
        get_tesseract_dir().display()
    ))
}

/// Candidate tessdata directories, most specific first.
fn tessdata_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![get_tesseract_dir().join("tessdata")];

    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        let p = PathBuf::from(&prefix);
        candidates.push(p.join("tessdata"));
        candidates.push(p);
    }

    for dir in SYSTEM_INSTALL_DIRS {
        candidates.push(Path::new(dir).join("tessdata"));
    }

    candidates
}

/// Finds a tessdata directory holding every requested language.
pub fn find_tessdata_dir(languages: &[String]) -> Option<PathBuf> {
    tessdata_candidates()
        .into_iter()
        .find(|dir| has_all_languages(dir, languages))
}

/// Ensures Tesseract and the trained data for `languages` are available.
///
/// Missing languages are copied from a system install when present, or
/// downloaded into our local tessdata dir.
pub fn ensure_tesseract(languages: &[String]) -> Result<TesseractPaths> {
    if languages.is_empty() {
        return Err(anyhow!("No OCR languages configured"));
    }

    let executable = find_tesseract_executable()?;
    log(&format!("Tesseract executable: {}", executable.display()));

    if let Some(tessdata) = find_tessdata_dir(languages) {
        log(&format!("Tessdata found at: {}", tessdata.display()));
        return Ok(TesseractPaths {
            executable,
            tessdata,
        });
    }

    let local_tessdata = get_tesseract_dir().join("tessdata");
    fs::create_dir_all(&local_tessdata)
        .with_context(|| format!("Failed to create {}", local_tessdata.display()))?;

    for lang in languages {
        let target = local_tessdata.join(traineddata_name(lang));
        if target.exists() {
            continue;
        }
        if !copy_from_system(lang, &target)? {
            download_tessdata(lang, &target)?;
        }
    }

    log(&format!("Tessdata ready at: {}", local_tessdata.display()));
    Ok(TesseractPaths {
        executable,
        tessdata: local_tessdata,
    })
}

/// Copies `<lang>.traineddata` from any known tessdata dir. Returns false if none has it.
fn copy_from_system(lang: &str, target: &Path) -> Result<bool> {
    let name = traineddata_name(lang);
    for dir in tessdata_candidates() {
        let source = dir.join(&name);
        if source.exists() && source != target {
            log(&format!("Copying {} from: {}", name, source.display()));
            fs::copy(&source, target)?;
            return Ok(true);
        }
    }
    Ok(false)
}

/// Downloads trained data for one language from the tessdata repository
fn download_tessdata(lang: &str, target: &Path) -> Result<()> {
    let name = traineddata_name(lang);
    let url = format!("{}/{}", TESSDATA_REPO, name);

    log(&format!("Downloading {}...", name));

    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(300))
        .build()?;

    let response = client
        .get(&url)
        .header("User-Agent", "quiz-autopilot")
        .send()?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Failed to download {}: HTTP {}",
            name,
            response.status()
        ));
    }

    let bytes = response.bytes()?;
    let mut file = fs::File::create(target)?;
    file.write_all(&bytes)?;

    log(&format!("Downloaded {} ({} bytes)", name, bytes.len()));

    Ok(())
}
