use std::env;

// The instrumented build is selected by the `deadlock` feature or by the
// thread sanitizer being active, unless `nodeadlock` overrides both.
fn main() {
    println!("cargo:rustc-check-cfg=cfg(deadlock_detection)");

    let opted_in = env::var_os("CARGO_FEATURE_DEADLOCK").is_some();
    let forced_off = env::var_os("CARGO_FEATURE_NODEADLOCK").is_some();

    if !forced_off && (opted_in || thread_sanitizer_enabled()) {
        println!("cargo:rustc-cfg=deadlock_detection");
    }

    println!("cargo:rerun-if-env-changed=RUSTFLAGS");
    println!("cargo:rerun-if-env-changed=CARGO_ENCODED_RUSTFLAGS");
}

fn thread_sanitizer_enabled() -> bool {
    if let Some(flags) = env::var_os("CARGO_ENCODED_RUSTFLAGS") {
        return flags
            .to_string_lossy()
            .split('\u{1f}')
            .any(is_tsan_flag);
    }
    if let Some(flags) = env::var_os("RUSTFLAGS") {
        return flags.to_string_lossy().split_whitespace().any(is_tsan_flag);
    }
    false
}

fn is_tsan_flag(flag: &str) -> bool {
    flag == "-Zsanitizer=thread"
}
