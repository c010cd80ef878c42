//! Field extraction from device status/settings JSON.
//!
//! Extraction is pure over the parsed JSON documents, so every rule here
//! is testable without a device on the network. Typed serde views enforce
//! the all-or-nothing policy: a missing expected field fails the whole
//! probe instead of yielding a partially populated collection.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value as Json;
use shelly_metrics::MetricCollection;

use crate::device::DeviceKind;
use crate::error::{DeviceError, DeviceResult};

/// Build the metric collection for one probed device.
///
/// Base extraction always runs first and applies to every kind; the
/// kind-specific extraction then appends its series. `Generic` stops at
/// the base set.
pub fn dispatch(
    kind: DeviceKind,
    name: &str,
    device_type: &str,
    extra_labels: &BTreeMap<String, String>,
    status: &Json,
    settings: Option<&Json>,
) -> DeviceResult<MetricCollection> {
    let malformed = |reason: String| DeviceError::Malformed {
        host: name.to_string(),
        reason,
    };

    // Collection labels: name and type shadow any configured extras.
    let mut base_labels = extra_labels.clone();
    base_labels.insert("name".to_string(), name.to_string());
    base_labels.insert("type".to_string(), device_type.to_string());
    let mut out = MetricCollection::with_prefix("shelly", base_labels);

    extract_base(&mut out, status).map_err(malformed)?;
    match kind {
        DeviceKind::PlugS => {
            let settings =
                settings.ok_or_else(|| malformed("missing /settings response".to_string()))?;
            extract_plug(&mut out, status, settings).map_err(malformed)?;
        }
        DeviceKind::Trv => extract_trv(&mut out, status).map_err(malformed)?,
        DeviceKind::HumidityTemp => extract_ht(&mut out, status).map_err(malformed)?,
        DeviceKind::Generic => {}
    }
    Ok(out)
}

fn parse<T: DeserializeOwned>(value: &Json) -> Result<T, String> {
    serde_json::from_value(value.clone()).map_err(|e| e.to_string())
}

// ── Generic fields reported by every device ────────────────────

#[derive(Deserialize)]
struct ConnectionStatus {
    connected: bool,
}

#[derive(Deserialize)]
struct CloudStatus {
    enabled: bool,
    connected: bool,
}

#[derive(Deserialize)]
struct UpdateStatus {
    has_update: bool,
}

#[derive(Deserialize)]
struct BaseStatus {
    wifi_sta: ConnectionStatus,
    cloud: CloudStatus,
    mqtt: ConnectionStatus,
    serial: i64,
    update: UpdateStatus,
    ram_total: u64,
    ram_free: u64,
    fs_size: u64,
    fs_free: u64,
    uptime: u64,
}

fn extract_base(out: &mut MetricCollection, status: &Json) -> Result<(), String> {
    let status: BaseStatus = parse(status)?;
    out.gauge(
        "wifi_sta_connected",
        status.wifi_sta.connected,
        &[],
        "Current status of the WiFi connection (connected or not)",
    );
    out.gauge(
        "cloud_enabled",
        status.cloud.enabled,
        &[],
        "Current cloud connection status (enabled or not)",
    );
    out.gauge(
        "cloud_connected",
        status.cloud.connected,
        &[],
        "Current cloud connection status (connected or not)",
    );
    out.gauge(
        "mqtt_connected",
        status.mqtt.connected,
        &[],
        "MQTT connection status, when MQTT is enabled (connected or not)",
    );
    out.gauge("serial", status.serial, &[], "Cloud serial number");
    out.gauge(
        "has_update",
        status.update.has_update,
        &[],
        "Whether an update is available",
    );
    out.gauge(
        "ram_total",
        status.ram_total,
        &[],
        "Total amount of system memory in bytes",
    );
    out.gauge(
        "ram_free",
        status.ram_free,
        &[],
        "Available amount of system memory in bytes",
    );
    out.gauge(
        "fs_size",
        status.fs_size,
        &[],
        "Total amount of the file system in bytes",
    );
    out.gauge(
        "fs_free",
        status.fs_free,
        &[],
        "Available amount of the file system in bytes",
    );
    out.counter("uptime", status.uptime, &[], "Seconds elapsed since boot");
    Ok(())
}

// ── Metered relay/plug ─────────────────────────────────────────

#[derive(Deserialize)]
struct RelayStatus {
    ison: bool,
    has_timer: bool,
    // Timer details are reported by the device only while a timer is
    // armed; they are required exactly then.
    timer_started: Option<u64>,
    timer_duration: Option<u64>,
    timer_remaining: Option<u64>,
    overpower: bool,
}

#[derive(Deserialize)]
struct MeterStatus {
    power: f64,
    is_valid: bool,
    total: f64,
}

#[derive(Deserialize)]
struct PlugStatus {
    relays: Vec<RelayStatus>,
    meters: Vec<MeterStatus>,
    temperature: f64,
    overtemperature: bool,
}

#[derive(Deserialize)]
struct PlugSettings {
    max_power: f64,
    led_status_disable: bool,
    led_power_disable: bool,
}

fn extract_plug(out: &mut MetricCollection, status: &Json, settings: &Json) -> Result<(), String> {
    let settings: PlugSettings = parse(settings)?;
    let status: PlugStatus = parse(status)?;

    out.gauge(
        "max_power",
        settings.max_power,
        &[],
        "Overpower threshold in Watts",
    );
    out.gauge(
        "led_status_disable",
        settings.led_status_disable,
        &[],
        "Whether LED indication for connection status is enabled",
    );
    out.gauge(
        "led_power_disable",
        settings.led_power_disable,
        &[],
        "Whether LED indication for output status is enabled",
    );
    out.gauge(
        "temperature",
        status.temperature,
        &[],
        "Internal device temperature in degrees Celsius",
    );
    out.gauge(
        "overtemperature",
        status.overtemperature,
        &[],
        "Whether the device has overheated",
    );

    for (index, relay) in status.relays.iter().enumerate() {
        let index = index.to_string();
        let labels = [("relay", index.as_str())];
        out.gauge(
            "relay_ison",
            relay.ison,
            &labels,
            "Whether the channel is turned ON or OFF",
        );
        out.gauge(
            "relay_has_timer",
            relay.has_timer,
            &labels,
            "Whether a timer is currently armed for this channel",
        );
        if relay.has_timer {
            let started = relay
                .timer_started
                .ok_or("missing field `timer_started` on relay with armed timer")?;
            let duration = relay
                .timer_duration
                .ok_or("missing field `timer_duration` on relay with armed timer")?;
            let remaining = relay
                .timer_remaining
                .ok_or("missing field `timer_remaining` on relay with armed timer")?;
            out.gauge(
                "relay_timer_started",
                started,
                &labels,
                "Unix timestamp of timer start; 0 if timer inactive or time not synced",
            );
            out.gauge("relay_timer_duration", duration, &labels, "Timer duration, s");
            out.gauge(
                "relay_timer_remaining",
                remaining,
                &labels,
                "Seconds until an active timer elapses; 0 otherwise",
            );
        }
        out.gauge("relay_overpower", relay.overpower, &labels, "");
    }

    for (index, meter) in status.meters.iter().enumerate() {
        let index = index.to_string();
        let labels = [("meter", index.as_str())];
        out.gauge(
            "meter_power",
            meter.power,
            &labels,
            "Current real AC power being drawn, in Watts",
        );
        out.gauge(
            "meter_is_valid",
            meter.is_valid,
            &labels,
            "Whether power metering self-checks OK",
        );
        out.gauge(
            "meter_total",
            meter.total,
            &labels,
            "Total energy consumed by the attached electrical appliance in Watt-minute",
        );
    }
    Ok(())
}

// ── Thermostatic radiator valve ────────────────────────────────

#[derive(Deserialize)]
struct BatteryStatus {
    value: f64,
    voltage: f64,
}

#[derive(Deserialize)]
struct TargetTemperature {
    enabled: bool,
    value: f64,
}

#[derive(Deserialize)]
struct Measurement {
    value: f64,
    is_valid: bool,
}

#[derive(Deserialize)]
struct ThermostatStatus {
    pos: f64,
    target_t: TargetTemperature,
    tmp: Measurement,
    schedule: bool,
    schedule_profile: i64,
    boost_minutes: f64,
}

#[derive(Deserialize)]
struct TrvStatus {
    bat: BatteryStatus,
    charger: bool,
    thermostats: Vec<ThermostatStatus>,
}

fn extract_trv(out: &mut MetricCollection, status: &Json) -> Result<(), String> {
    let status: TrvStatus = parse(status)?;

    out.gauge("bat_charge", status.bat.value, &[], "Percentage of battery level");
    out.gauge("bat_voltage", status.bat.voltage, &[], "Battery voltage");
    out.gauge(
        "bat_charger",
        status.charger,
        &[],
        "Whether a charger is plugged in",
    );

    for (index, thermostat) in status.thermostats.iter().enumerate() {
        let index = index.to_string();
        let labels = [("thermostats", index.as_str())];
        out.gauge("pos", thermostat.pos, &labels, "Position of thermostat pin");
        out.gauge(
            "thermostat_enabled",
            thermostat.target_t.enabled,
            &labels,
            "Whether the thermostat is enabled",
        );
        out.gauge(
            "thermostat_target_t",
            thermostat.target_t.value,
            &labels,
            "Thermostat target temperature",
        );
        out.gauge(
            "thermostat_measured_temperature",
            thermostat.tmp.value,
            &labels,
            "Thermostat measured temperature",
        );
        out.gauge(
            "thermostat_measured_valid",
            thermostat.tmp.is_valid,
            &labels,
            "Whether the temperature measurement is valid",
        );
        out.gauge(
            "thermostat_is_scheduled",
            thermostat.schedule,
            &labels,
            "Whether the thermostat is following a schedule",
        );
        out.gauge(
            "thermostat_schedule_profile",
            thermostat.schedule_profile,
            &labels,
            "Current thermostat profile",
        );
        out.gauge(
            "thermostat_boost_minutes",
            thermostat.boost_minutes,
            &labels,
            "Length of initial warm-up boost, in minutes",
        );
    }
    Ok(())
}

// ── Humidity/temperature sensor ────────────────────────────────

#[derive(Deserialize)]
struct HtStatus {
    bat: BatteryStatus,
    hum: Measurement,
    tmp: Measurement,
}

fn extract_ht(out: &mut MetricCollection, status: &Json) -> Result<(), String> {
    let status: HtStatus = parse(status)?;

    out.gauge("bat_charge", status.bat.value, &[], "Percentage of battery level");
    out.gauge("bat_voltage", status.bat.voltage, &[], "Battery voltage");
    out.gauge("humidity", status.hum.value, &[], "Air humidity, in %rH");
    out.gauge(
        "humidity_valid",
        status.hum.is_valid,
        &[],
        "Whether the humidity measurement is valid",
    );
    out.gauge("temperature", status.tmp.value, &[], "Air temperature");
    out.gauge(
        "temperature_valid",
        status.tmp.is_valid,
        &[],
        "Whether the temperature measurement is valid",
    );
    Ok(())
}
