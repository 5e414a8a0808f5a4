use std::path::PathBuf;

fn main() {
    // Re-run when the server catalogue changes
    println!("cargo:rerun-if-changed=registry/");

    // include_dir! fails on a missing directory, so make sure it exists
    let registry_path = PathBuf::from("registry");
    if !registry_path.exists() {
        std::fs::create_dir_all(&registry_path).expect("Failed to create registry directory");
    }
}
