fn main() {
    println!(
        "cargo:rustc-env=STATIC_BUILD_DATE={}",
        chrono::Utc::now().to_rfc3339()
    );
    println!("cargo:rerun-if-changed=migrations");
}
