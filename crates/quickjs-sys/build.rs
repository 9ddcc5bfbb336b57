use std::env;
use std::path::PathBuf;

fn main() {
    let this_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());

    // Direct dependents read this as DEP_WL_API_INCLUDE. The header needs
    // nothing else on the include path.
    println!("cargo:include={}", this_dir.join("include").display());
    println!("cargo:rerun-if-changed=include/wl_api.h");
}
