//! Build script for the admin crate.
//!
//! Copies the stylesheet and script to content-hashed filenames under
//! `static/*/derived/`.

use std::env;
use std::fs;
use std::path::PathBuf;

use sha2::{Digest, Sha256};

const ASSETS: [(&str, &str, &str); 2] = [
    ("css", "admin.css", "CSS_HASH"),
    ("js", "admin.js", "JS_HASH"),
];

fn main() {
    let manifest_dir =
        env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR must be set by Cargo");

    for (dir, file, env_name) in ASSETS {
        let asset_dir = PathBuf::from(&manifest_dir).join("static").join(dir);
        let source = asset_dir.join(file);
        println!("cargo:rerun-if-changed={}", source.display());

        let Ok(content) = fs::read(&source) else {
            println!("cargo:warning=Missing asset {}", source.display());
            println!("cargo:rustc-env={env_name}=");
            continue;
        };

        let digest = format!("{:x}", Sha256::digest(&content));
        let short = digest.get(..8).unwrap_or(&digest);
        println!("cargo:rustc-env={env_name}={short}");

        let (stem, ext) = file.rsplit_once('.').unwrap_or((file, ""));
        let derived = asset_dir.join("derived");
        fs::create_dir_all(&derived).expect("Failed to create derived asset directory");
        fs::write(derived.join(format!("{stem}.{short}.{ext}")), &content)
            .expect("Failed to write hashed asset");
    }
}
