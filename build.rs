fn main() {
    // Propagate ESP-IDF link/cfg/include args from esp-idf-sys. Host builds
    // (library tests) have nothing to propagate.
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        if let Err(err) = embuild::build::LinkArgs::output_propagated("ESP_IDF") {
            println!("cargo:warning=esp-idf link args not propagated: {err}");
        }
        if let Err(err) = embuild::build::CfgArgs::output_propagated("ESP_IDF") {
            println!("cargo:warning=esp-idf cfg args not propagated: {err}");
        }
    }

    // Build-time configuration read through option_env! in src/config.rs.
    for var in [
        "WIFI_SSID",
        "WIFI_PASS",
        "MQTT_HOST",
        "MQTT_PORT",
        "MQTT_USER",
        "MQTT_PASS",
        "MQTT_CLIENT_ID",
        "MQTT_PREFIX",
        "DHT_GPIO",
        "POLL_INTERVAL_SECS",
    ] {
        println!("cargo:rerun-if-env-changed={var}");
    }
}
