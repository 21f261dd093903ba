fn main() {
    // Broker and Wi-Fi credentials are baked in at build time.
    for var in [
        "LIGHTSYNC_WIFI_SSID",
        "LIGHTSYNC_WIFI_PASSWORD",
        "LIGHTSYNC_MQTT_HOST",
        "LIGHTSYNC_MQTT_USER",
        "LIGHTSYNC_MQTT_PASSWORD",
    ] {
        println!("cargo:rerun-if-env-changed={var}");
    }

    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
