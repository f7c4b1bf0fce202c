//! Build script for the storefront crate.
//!
//! Content-hashes the stylesheet and script so they can be served with
//! immutable cache headers.

use std::env;
use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

fn main() {
    hash_asset("css", "main.css", "CSS_HASH");
    hash_asset("js", "bazaar.js", "JS_HASH");
}

/// Hash `static/{dir}/{file}` and copy it to `static/{dir}/derived/` with the
/// hash in its filename. Sets `env_name` for use with `env!`.
fn hash_asset(dir: &str, file: &str, env_name: &str) {
    let manifest_dir =
        env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR must be set by Cargo");
    let asset_dir = Path::new(&manifest_dir).join("static").join(dir);
    let asset_path = asset_dir.join(file);

    println!("cargo:rerun-if-changed={}", asset_path.display());

    let content = match fs::read(&asset_path) {
        Ok(content) => content,
        Err(e) => {
            println!("cargo:warning=Could not read {file}: {e}");
            println!("cargo:rustc-env={env_name}=");
            return;
        }
    };

    // First 8 chars of SHA256
    let hash = format!("{:x}", Sha256::digest(&content));
    let short_hash = hash.get(..8).unwrap_or(&hash);

    println!("cargo:rustc-env={env_name}={short_hash}");

    let (stem, ext) = file.rsplit_once('.').unwrap_or((file, ""));
    let derived_dir = asset_dir.join("derived");
    fs::create_dir_all(&derived_dir).expect("Failed to create derived asset directory");
    fs::copy(
        &asset_path,
        derived_dir.join(format!("{stem}.{short_hash}.{ext}")),
    )
    .expect("Failed to copy asset to derived directory");
}
