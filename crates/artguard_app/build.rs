use std::env;

fn main() {
    let version = env::var("ARTGUARD_VERSION")
        .or_else(|_| env::var("CARGO_PKG_VERSION"))
        .unwrap_or_else(|_| "dev".to_string());
    println!("cargo:rerun-if-env-changed=ARTGUARD_VERSION");
    println!("cargo:rustc-env=ARTGUARD_VERSION={version}");
}
