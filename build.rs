// Build script for sdl3-instances
//
// The `sdl3` feature links against the system SDL3 library. Set `SDL3_LIB_DIR`
// when the library lives outside the default linker search path.

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=SDL3_LIB_DIR");

    if std::env::var_os("CARGO_FEATURE_SDL3").is_none() {
        return;
    }

    if let Some(dir) = std::env::var_os("SDL3_LIB_DIR") {
        println!("cargo:rustc-link-search=native={}", dir.to_string_lossy());
    }
}
