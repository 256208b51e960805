// ── Per-probe metric registry ──
//
// Every probe gets a fresh `prometheus::Registry` so label sets from one
// target never leak into another target's response. All series carry a
// constant `master=<target>` label.

use prometheus::core::Collector;
use prometheus::{
    Encoder, Gauge, GaugeVec, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry,
    TextEncoder,
};

use crate::derive::{DerivedMetrics, Role};
use crate::signal::{SignalCounts, SignalQualityMode};

const TARGET_LABEL: &str = "master";
const AP_LABELS: &[&str] = &["name", "mac", "model"];
const RADIO_LABELS: &[&str] = &["name", "mac", "model", "radio"];
const STATUS_LABELS: &[&str] = &["name", "mac", "model", "ip", "fw", "role"];
const SIGNAL_LABELS: &[&str] = &["name", "mac", "radio", "quality"];

/// Content type of the rendered exposition body.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Scrape stages timed into `ruckus_exporter_scrape_duration_seconds`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Module {
    Login,
    ApiRequests,
    Processing,
    Total,
}

impl Module {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::ApiRequests => "api_requests",
            Self::Processing => "processing",
            Self::Total => "total",
        }
    }
}

enum SignalMetric {
    Snapshot(GaugeVec),
    Cumulative(IntCounterVec),
}

/// All metric families exposed for one probe.
pub struct ProbeMetrics {
    registry: Registry,

    scrape_success: Gauge,
    scrape_duration: HistogramVec,
    slowest_module: GaugeVec,

    total_clients: Gauge,
    total_aps: Gauge,
    total_rx_bytes: Gauge,
    total_tx_bytes: Gauge,
    role_count: GaugeVec,

    // Label-less vecs, so each series exists only once it is set.
    controller_cpu: GaugeVec,
    controller_mem: GaugeVec,
    controller_uptime: GaugeVec,

    ap_status: GaugeVec,
    ap_uptime: GaugeVec,
    ap_clients: GaugeVec,
    ap_rx_bytes: GaugeVec,
    ap_tx_bytes: GaugeVec,
    ap_cpu: GaugeVec,
    ap_mem: GaugeVec,
    ap_noise_floor: GaugeVec,
    ap_airtime: GaugeVec,

    signal_quality: SignalMetric,
}

impl ProbeMetrics {
    /// Build and register every family for a probe of `target`.
    pub fn new(target: &str, signal_mode: SignalQualityMode) -> Result<Self, prometheus::Error> {
        let f = Families {
            registry: Registry::new(),
            target,
        };

        let signal_name = "ruckus_unleashed_ap_client_signal_quality_count";
        let signal_help = "RSSI breakdown";
        let signal_quality = match signal_mode {
            SignalQualityMode::Snapshot => {
                SignalMetric::Snapshot(f.gauge_vec(signal_name, signal_help, SIGNAL_LABELS)?)
            }
            SignalQualityMode::Cumulative => {
                SignalMetric::Cumulative(f.counter_vec(signal_name, signal_help, SIGNAL_LABELS)?)
            }
        };

        Ok(Self {
            scrape_success: f.gauge("ruckus_exporter_last_scrape_success", "1 if successful")?,
            scrape_duration: f.histogram_vec(
                "ruckus_exporter_scrape_duration_seconds",
                "Duration per module",
                &["module"],
            )?,
            slowest_module: f.gauge_vec(
                "ruckus_exporter_slowest_module_duration_seconds",
                "Slowest module duration",
                &["module_name"],
            )?,
            total_clients: f.gauge("ruckus_unleashed_network_clients_total", "Total wireless stations")?,
            total_aps: f.gauge("ruckus_unleashed_network_aps_total", "Total APs")?,
            total_rx_bytes: f.gauge("ruckus_unleashed_network_rx_bytes_total", "Total RX")?,
            total_tx_bytes: f.gauge("ruckus_unleashed_network_tx_bytes_total", "Total TX")?,
            role_count: f.gauge_vec("ruckus_unleashed_ap_role_count", "Master vs Member count", &["role"])?,
            controller_cpu: f.gauge_vec("ruckus_unleashed_controller_cpu_usage_percent", "Master CPU %", &[])?,
            controller_mem: f.gauge_vec("ruckus_unleashed_controller_memory_usage_percent", "Master RAM %", &[])?,
            controller_uptime: f.gauge_vec("ruckus_unleashed_controller_uptime_seconds", "Master Uptime", &[])?,
            ap_status: f.gauge_vec("ruckus_unleashed_ap_status", "1=Online, 0=Offline", STATUS_LABELS)?,
            ap_uptime: f.gauge_vec("ruckus_unleashed_ap_uptime_seconds", "AP Uptime", AP_LABELS)?,
            ap_clients: f.gauge_vec("ruckus_unleashed_ap_clients", "Clients per AP", AP_LABELS)?,
            ap_rx_bytes: f.gauge_vec("ruckus_unleashed_ap_rx_bytes_total", "RX per AP", AP_LABELS)?,
            ap_tx_bytes: f.gauge_vec("ruckus_unleashed_ap_tx_bytes_total", "TX per AP", AP_LABELS)?,
            ap_cpu: f.gauge_vec("ruckus_unleashed_ap_cpu_utilization", "CPU per AP", AP_LABELS)?,
            ap_mem: f.gauge_vec("ruckus_unleashed_ap_memory_usage_percent", "RAM per AP", AP_LABELS)?,
            ap_noise_floor: f.gauge_vec(
                "ruckus_unleashed_ap_noise_floor_dbm",
                "Radio interference level",
                RADIO_LABELS,
            )?,
            ap_airtime: f.gauge_vec(
                "ruckus_unleashed_ap_airtime_utilization_percent",
                "Airtime utilization %",
                RADIO_LABELS,
            )?,
            signal_quality,
            registry: f.registry,
        })
    }

    pub fn set_success(&self, success: bool) {
        self.scrape_success.set(if success { 1.0 } else { 0.0 });
    }

    pub fn observe_duration(&self, module: Module, seconds: f64) {
        self.scrape_duration
            .with_label_values(&[module.as_str()])
            .observe(seconds);
    }

    pub fn set_slowest(&self, module: Module, seconds: f64) {
        self.slowest_module
            .with_label_values(&[module.as_str()])
            .set(seconds);
    }

    /// Publish one scrape's derived values.
    ///
    /// `signal` holds this scrape's counts in snapshot mode and the running
    /// totals in cumulative mode.
    #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
    pub fn publish(&self, derived: &DerivedMetrics, signal: &SignalCounts) {
        for ap in &derived.aps {
            let id = &ap.identity;
            let labels = [id.name.as_str(), id.mac.as_str(), id.model.as_str()];

            self.ap_uptime.with_label_values(&labels).set(ap.uptime_secs);
            self.ap_clients.with_label_values(&labels).set(ap.clients);
            self.ap_rx_bytes.with_label_values(&labels).set(ap.rx_bytes);
            self.ap_tx_bytes.with_label_values(&labels).set(ap.tx_bytes);
            self.ap_cpu.with_label_values(&labels).set(ap.cpu_percent);
            if let Some(mem) = ap.memory_percent {
                self.ap_mem.with_label_values(&labels).set(mem);
            }
            self.ap_status
                .with_label_values(&[
                    id.name.as_str(),
                    id.mac.as_str(),
                    id.model.as_str(),
                    ap.ip.as_str(),
                    ap.firmware.as_str(),
                    ap.role_label.as_str(),
                ])
                .set(if ap.online { 1.0 } else { 0.0 });
        }

        for radio in &derived.radios {
            let id = &radio.identity;
            let labels = [
                id.name.as_str(),
                id.mac.as_str(),
                id.model.as_str(),
                radio.band.as_str(),
            ];
            if let Some(noise) = radio.noise_floor_dbm {
                self.ap_noise_floor.with_label_values(&labels).set(noise);
            }
            if let Some(airtime) = radio.airtime_percent {
                self.ap_airtime.with_label_values(&labels).set(airtime);
            }
        }

        if let Some(controller) = &derived.controller {
            self.controller_cpu.with_label_values(&[]).set(controller.cpu_percent);
            self.controller_uptime.with_label_values(&[]).set(controller.uptime_secs);
            if let Some(mem) = controller.memory_percent {
                self.controller_mem.with_label_values(&[]).set(mem);
            }
        }

        let totals = &derived.totals;
        self.total_clients.set(totals.clients);
        self.total_aps.set(totals.aps as f64);
        self.total_rx_bytes.set(totals.rx_bytes);
        self.total_tx_bytes.set(totals.tx_bytes);
        self.role_count
            .with_label_values(&[Role::Master.as_str()])
            .set(totals.masters as f64);
        self.role_count
            .with_label_values(&[Role::Member.as_str()])
            .set(totals.members as f64);

        for (key, count) in signal {
            let labels = [
                key.ap_name.as_str(),
                key.ap_mac.as_str(),
                key.band.as_str(),
                key.quality.as_ref(),
            ];
            match &self.signal_quality {
                SignalMetric::Snapshot(gauge) => gauge.with_label_values(&labels).set(*count as f64),
                SignalMetric::Cumulative(counter) => counter.with_label_values(&labels).inc_by(*count),
            }
        }
    }

    /// Render the registry in the Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Registers families on a probe registry, stamping the target label.
struct Families<'a> {
    registry: Registry,
    target: &'a str,
}

impl Families<'_> {
    fn opts(&self, name: &str, help: &str) -> Opts {
        Opts::new(name, help).const_label(TARGET_LABEL, self.target)
    }

    fn register<C>(&self, collector: C) -> Result<C, prometheus::Error>
    where
        C: Collector + Clone + 'static,
    {
        self.registry.register(Box::new(collector.clone()))?;
        Ok(collector)
    }

    fn gauge(&self, name: &str, help: &str) -> Result<Gauge, prometheus::Error> {
        self.register(Gauge::with_opts(self.opts(name, help))?)
    }

    fn gauge_vec(&self, name: &str, help: &str, labels: &[&str]) -> Result<GaugeVec, prometheus::Error> {
        self.register(GaugeVec::new(self.opts(name, help), labels)?)
    }

    fn counter_vec(
        &self,
        name: &str,
        help: &str,
        labels: &[&str],
    ) -> Result<IntCounterVec, prometheus::Error> {
        self.register(IntCounterVec::new(self.opts(name, help), labels)?)
    }

    fn histogram_vec(
        &self,
        name: &str,
        help: &str,
        labels: &[&str],
    ) -> Result<HistogramVec, prometheus::Error> {
        let opts = HistogramOpts::new(name, help).const_label(TARGET_LABEL, self.target);
        self.register(HistogramVec::new(opts, labels)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::derive::{ApIdentity, ApMetrics, ControllerMetrics, NetworkTotals, RadioMetrics};
    use crate::airtime::AirtimeTracker;
    use crate::derive::{ScrapeRecords, derive};
    use crate::signal::{SignalKey, SignalQuality};
    use unleashed_api::{find_all, xml::parse};

    fn identity() -> ApIdentity {
        ApIdentity {
            name: "Lobby".into(),
            mac: "aa:aa:aa:aa:aa:01".into(),
            model: "r650".into(),
        }
    }

    fn derived() -> DerivedMetrics {
        DerivedMetrics {
            aps: vec![ApMetrics {
                identity: identity(),
                ip: "10.0.0.2".into(),
                firmware: "200.15".into(),
                role_label: "master".into(),
                role: Role::Master,
                online: true,
                uptime_secs: 100.0,
                clients: 7.0,
                rx_bytes: 1000.0,
                tx_bytes: 2000.0,
                cpu_percent: 12.0,
                memory_percent: None,
            }],
            radios: vec![RadioMetrics {
                identity: identity(),
                band: "5g".into(),
                noise_floor_dbm: Some(-90.0),
                airtime_percent: None,
            }],
            controller: None,
            totals: NetworkTotals {
                clients: 7.0,
                aps: 1,
                rx_bytes: 1000.0,
                tx_bytes: 2000.0,
                masters: 1,
                members: 0,
            },
            signal: SignalCounts::new(),
        }
    }

    fn signal() -> SignalCounts {
        [(
            SignalKey {
                ap_name: "Lobby".into(),
                ap_mac: "aa:aa:aa:aa:aa:01".into(),
                band: "5g".into(),
                quality: SignalQuality::Good,
            },
            3,
        )]
        .into_iter()
        .collect()
    }

    #[test]
    fn failed_probe_still_renders_success_gauge() {
        let metrics = ProbeMetrics::new("10.0.0.1", SignalQualityMode::Snapshot).unwrap();
        metrics.set_success(false);
        let body = metrics.render().unwrap();
        assert!(body.contains(r#"ruckus_exporter_last_scrape_success{master="10.0.0.1"} 0"#));
    }

    #[test]
    fn published_values_carry_labels() {
        let metrics = ProbeMetrics::new("10.0.0.1", SignalQualityMode::Snapshot).unwrap();
        metrics.publish(&derived(), &signal());
        let body = metrics.render().unwrap();

        assert!(body.contains(
            r#"ruckus_unleashed_ap_clients{mac="aa:aa:aa:aa:aa:01",master="10.0.0.1",model="r650",name="Lobby"} 7"#
        ));
        assert!(body.contains(r#"ruckus_unleashed_ap_role_count{master="10.0.0.1",role="member"} 0"#));
        assert!(body.contains("ruckus_unleashed_ap_noise_floor_dbm{"));
        assert!(body.contains("# TYPE ruckus_unleashed_ap_client_signal_quality_count gauge"));
        assert!(body.contains(r#"quality="good",radio="5g"} 3"#));
    }

    #[test]
    fn omitted_values_are_not_rendered() {
        let metrics = ProbeMetrics::new("t", SignalQualityMode::Snapshot).unwrap();
        metrics.publish(&derived(), &SignalCounts::new());
        let body = metrics.render().unwrap();
        assert!(!body.contains("ruckus_unleashed_ap_memory_usage_percent{"));
        assert!(!body.contains("ruckus_unleashed_ap_airtime_utilization_percent{"));
        assert!(!body.contains("NaN"));
        assert!(!body.contains("ruckus_unleashed_controller_cpu_usage_percent{"));
        assert!(!body.contains("ruckus_unleashed_controller_uptime_seconds{"));
    }

    #[test]
    fn controller_memory_omitted_without_total() {
        let metrics = ProbeMetrics::new("t", SignalQualityMode::Snapshot).unwrap();
        let mut derived = derived();
        derived.controller = Some(ControllerMetrics {
            cpu_percent: 9.0,
            uptime_secs: 500.0,
            memory_percent: None,
        });
        metrics.publish(&derived, &SignalCounts::new());
        let body = metrics.render().unwrap();
        assert!(body.contains(r#"ruckus_unleashed_controller_cpu_usage_percent{master="t"} 9"#));
        assert!(body.contains(r#"ruckus_unleashed_controller_uptime_seconds{master="t"} 500"#));
        assert!(!body.contains("ruckus_unleashed_controller_memory_usage_percent{"));
    }

    #[test]
    fn master_with_zero_memory_total_has_no_memory_series() {
        let doc = parse(r#"<r><ap mac="01" role="master" mem_total="0" mem_avail="0" cpu_util="4"/></r>"#)
            .unwrap();
        let status = find_all(&doc, "ap");
        let derived = derive(
            ScrapeRecords {
                inventory: &[],
                status: &status,
                clients: &[],
            },
            &AirtimeTracker::new(),
        );

        let metrics = ProbeMetrics::new("t", SignalQualityMode::Snapshot).unwrap();
        metrics.publish(&derived, &derived.signal);
        let body = metrics.render().unwrap();
        assert!(body.contains(r#"ruckus_unleashed_controller_cpu_usage_percent{master="t"} 4"#));
        assert!(!body.contains("ruckus_unleashed_controller_memory_usage_percent{"));
    }

    #[test]
    fn cumulative_mode_exposes_a_counter() {
        let metrics = ProbeMetrics::new("t", SignalQualityMode::Cumulative).unwrap();
        metrics.publish(&derived(), &signal());
        let body = metrics.render().unwrap();
        assert!(body.contains("# TYPE ruckus_unleashed_ap_client_signal_quality_count counter"));
        assert!(body.contains(r#"quality="good",radio="5g"} 3"#));
    }

    #[test]
    fn durations_by_module() {
        let metrics = ProbeMetrics::new("t", SignalQualityMode::Snapshot).unwrap();
        metrics.observe_duration(Module::Total, 0.25);
        metrics.set_slowest(Module::ApiRequests, 0.2);
        let body = metrics.render().unwrap();
        assert!(body.contains(r#"ruckus_exporter_scrape_duration_seconds_count{master="t",module="total"} 1"#));
        assert!(body.contains(
            r#"ruckus_exporter_slowest_module_duration_seconds{master="t",module_name="api_requests"} 0.2"#
        ));
    }
}
