//! Build script to track include_str! dependencies.
//! This ensures cargo rebuilds when template files change.

fn main() {
    println!("cargo:rerun-if-changed=resources/config.json");
}
