use crate::config::ThresholdSet;
use crate::error::StationError;
use crate::evaluator::{MetricVerdict, evaluate_metric, is_evaluable};
use crate::latency::{LatencySeries, evaluate_timeliness};
use crate::metrics::{MetricQuery, MetricTable};
use crate::report::output::report_file_name;
use crate::report::types::{ChannelReport, Report};
use crate::soh::{InstrumentType, Plotter, SohInputs, SohVerdicts};
use crate::station::{StationId, ValidationPeriod};
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

/// Everything a report is assembled from.
pub struct ReportInputs<'a> {
    pub station: &'a StationId,
    pub period: &'a ValidationPeriod,
    pub table: &'a MetricTable,
    pub latency: Option<&'a LatencySeries>,
    pub thresholds: &'a ThresholdSet,
    /// `None` skips the SOH sections.
    pub instrument: Option<InstrumentType>,
    pub soh: &'a SohInputs,
}

/// Assembles the report for one station.
///
/// Fails only when the metric table holds nothing evaluable. Missing
/// latency or SOH data is logged and the section left out.
#[tracing::instrument(
    skip_all,
    fields(station = %inputs.station.snlc(), period = %inputs.period.label())
)]
pub fn build_report(inputs: &ReportInputs<'_>, plotter: &dyn Plotter) -> anyhow::Result<Report> {
    let channels = evaluate_channels(inputs)?;
    let timely_availability = evaluate_latency(inputs);
    let soh = evaluate_soh(inputs, plotter);

    let station = inputs.station;
    Ok(Report {
        network_code: station.network.clone(),
        station_code: station.station.clone(),
        location_code: station.location.clone(),
        start_date: inputs.period.start(),
        end_date: inputs.period.last_day(),
        channels,
        timely_availability,
        soh,
        file_name: report_file_name(station, inputs.period),
    })
}

fn evaluate_channels(
    inputs: &ReportInputs<'_>,
) -> anyhow::Result<BTreeMap<String, ChannelReport>> {
    let station = inputs.station;
    // Without a location code every location recorded for the station counts.
    let location = station.location.as_deref();

    let metrics: Vec<String> = inputs
        .table
        .metric_names()?
        .into_iter()
        .filter(|m| is_evaluable(m))
        .collect();
    if metrics.is_empty() {
        return Err(StationError::NoMetricsFound.into());
    }

    let codes = match location {
        Some(location) => inputs
            .table
            .channels_at(&station.network, &station.station, location)?,
        None => inputs.table.channels(&station.network, &station.station)?,
    };

    let mut channels = BTreeMap::new();
    for channel in codes {
        let mut report = ChannelReport::default();
        for metric in &metrics {
            let query = MetricQuery::metric(metric)
                .network(&station.network)
                .station(&station.station)
                .location(location)
                .channel(&channel);
            let values = inputs.table.values(&query)?;
            let Some(verdict) = evaluate_metric(metric, &values, inputs.thresholds) else {
                continue;
            };
            debug!(
                channel = %channel,
                metric = %metric,
                ?values,
                passed = verdict.passed(),
                "Metric evaluated"
            );
            if !verdict.passed() {
                info!(
                    channel = %channel,
                    metric = %metric,
                    details = verdict.details(),
                    "Metric failed"
                );
            }
            report.metrics.insert(metric.clone(), verdict);
        }
        channels.insert(channel, report);
    }

    if channels.is_empty() {
        warn!("No channels recorded for the station");
    }
    Ok(channels)
}

fn evaluate_latency(inputs: &ReportInputs<'_>) -> Option<MetricVerdict> {
    let Some(series) = inputs.latency else {
        warn!("No latency data supplied. Skipping latency report.");
        return None;
    };
    match evaluate_timeliness(
        series,
        &inputs.station.network,
        &inputs.station.station,
        inputs.thresholds,
    ) {
        Ok(verdict) => {
            info!(passed = verdict.passed(), "Latency evaluated");
            Some(verdict)
        }
        Err(e) => {
            error!(error = %e, "Latency evaluation failed");
            warn!("Skipping latency report.");
            None
        }
    }
}

fn evaluate_soh(inputs: &ReportInputs<'_>, plotter: &dyn Plotter) -> SohVerdicts {
    let Some(instrument) = inputs.instrument else {
        info!("No instrument type given. Skipping SOH report.");
        return SohVerdicts::default();
    };

    let outcome = instrument.family().evaluate(inputs.soh, inputs.thresholds);

    for reason in &outcome.skipped {
        warn!(instrument = %instrument, reason = %reason, "SOH section skipped");
    }
    for request in &outcome.plots {
        if let Err(e) = plotter.plot(request) {
            error!(error = %e, "Failed to plot SOH data");
        }
    }

    outcome.verdicts
}
