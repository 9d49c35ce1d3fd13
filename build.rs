fn main() {
    println!("cargo:rerun-if-env-changed=OTA_WIFI_SSID");
    println!("cargo:rerun-if-env-changed=OTA_WIFI_PASSWORD");
    println!("cargo:rerun-if-env-changed=OTA_MANIFEST_URL");
    println!("cargo:rerun-if-env-changed=OTA_BEARER_TOKEN");
    println!("cargo:rerun-if-env-changed=OTA_CHECK_INTERVAL_SECS");

    // ESP-IDF link arguments are only meaningful when cross-compiling for
    // the chip; host builds (tests, simulation) skip them.
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();
    }
}
