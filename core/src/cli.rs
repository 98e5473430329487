use crate::models::SensorKind;
use crate::report::FlightReport;

/// Human summary of a flight report on stdout.
pub fn print_report(report: &FlightReport) {
    println!("--- Flight Report: {} ---", report.flight_label);

    for kind in SensorKind::ALL {
        let Some(k) = report.kinds.get(&kind) else { continue };
        println!(
            "{:<8} samples: {:>6}  missing data: {:>5}  outliers: {:>5}",
            kind.label(),
            k.samples,
            k.missing_data,
            k.outliers
        );
    }

    if let Some(b) = &report.barometric {
        println!(
            "Barometric: max height {:.1} m at t={}, max speed {:.3}, max accel {:.4}",
            b.max_height, b.apex_time, b.max_speed, b.max_acceleration
        );
    }
    if let Some(g) = &report.gps_vertical {
        println!("GPS: max altitude {:.1} m at t={}", g.max_height, g.apex_time);
    }

    match &report.wind {
        Some(w) => println!(
            "Wind: avg speed {:.4}, avg direction {:.1}° ({} vectors)",
            w.average_speed, w.average_direction_deg, w.vectors
        ),
        None => println!("Wind: not enough GPS fixes"),
    }

    if let Some(c) = &report.comparison {
        let verdict = if c.significant {
            "significant difference"
        } else {
            "within threshold"
        };
        println!(
            "Temperature: probe {:.1} °C vs reference {:.1} °C (Δ {:+.1}, {verdict})",
            c.probe_temperature, c.reference_temperature, c.difference
        );
    }
}
