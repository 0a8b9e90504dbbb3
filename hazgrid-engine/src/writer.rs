//! Source-model writer
//!
//! Serializes an assembled sequence of point sources into an NRML-style XML
//! artifact for the hazard-calculation engine. The sources handed in are
//! expected to be fully populated and internally consistent; this module is
//! deliberately thin and performs no rate processing of its own.

use hazgrid_core::errors::{HazGridError, HazGridResult};
use hazgrid_core::source::{PointSource, TemporalOccurrenceModel};
use log::info;
use std::fmt::{self, Write as _};
use std::path::Path;

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn render_tom(out: &mut String, tom: &TemporalOccurrenceModel) -> fmt::Result {
    match tom {
        TemporalOccurrenceModel::Poisson { time_span } => writeln!(
            out,
            r#"            <temporalOccurrenceModel type="poisson" timeSpan="{}"/>"#,
            time_span
        ),
        TemporalOccurrenceModel::NegativeBinomial {
            time_span,
            mean,
            alpha,
        } => writeln!(
            out,
            r#"            <temporalOccurrenceModel type="negative_binomial" timeSpan="{}" mean="{}" alpha="{}"/>"#,
            time_span, mean, alpha
        ),
    }
}

fn render_point_source(out: &mut String, source: &PointSource) -> fmt::Result {
    writeln!(
        out,
        r#"        <pointSource id="{}" name="{}" tectonicRegion="{}">"#,
        escape_xml(&source.id),
        escape_xml(&source.name),
        escape_xml(&source.tectonic_region)
    )?;
    writeln!(out, "            <pointGeometry>")?;
    writeln!(
        out,
        "                <gml:Point><gml:pos>{} {}</gml:pos></gml:Point>",
        source.location.lon, source.location.lat
    )?;
    writeln!(
        out,
        "                <upperSeismoDepth>{}</upperSeismoDepth>",
        source.upper_seismogenic_depth
    )?;
    writeln!(
        out,
        "                <lowerSeismoDepth>{}</lowerSeismoDepth>",
        source.lower_seismogenic_depth
    )?;
    writeln!(out, "            </pointGeometry>")?;
    writeln!(
        out,
        "            <magScaleRel>{}</magScaleRel>",
        source.magnitude_scaling.engine_name()
    )?;
    writeln!(
        out,
        "            <ruptMeshSpacing>{}</ruptMeshSpacing>",
        source.rupture_mesh_spacing
    )?;
    writeln!(
        out,
        "            <ruptAspectRatio>{}</ruptAspectRatio>",
        source.rupture_aspect_ratio
    )?;

    writeln!(
        out,
        r#"            <incrementalMFD minMag="{}" binWidth="{}">"#,
        source.mfd.min_mag, source.mfd.bin_width
    )?;
    let rates: Vec<String> = source
        .mfd
        .occurrence_rates
        .iter()
        .map(|rate| rate.to_string())
        .collect();
    writeln!(
        out,
        "                <occurRates>{}</occurRates>",
        rates.join(" ")
    )?;
    writeln!(out, "            </incrementalMFD>")?;

    writeln!(out, "            <nodalPlaneDist>")?;
    for (weight, plane) in source.nodal_plane_distribution.iter() {
        writeln!(
            out,
            r#"                <nodalPlane probability="{}" strike="{}" dip="{}" rake="{}"/>"#,
            weight, plane.strike, plane.dip, plane.rake
        )?;
    }
    writeln!(out, "            </nodalPlaneDist>")?;

    writeln!(out, "            <hypoDepthDist>")?;
    for (weight, depth) in source.hypocenter_distribution.iter() {
        writeln!(
            out,
            r#"                <hypoDepth probability="{}" depth="{}"/>"#,
            weight, depth
        )?;
    }
    writeln!(out, "            </hypoDepthDist>")?;

    render_tom(out, &source.temporal_occurrence_model)?;
    writeln!(out, "        </pointSource>")
}

/// Write a source-model artifact for a non-empty sequence of point sources.
///
/// Ownership of the source values stays with the caller; the artifact at
/// `path` is overwritten if present.
pub fn write_source_model(
    path: impl AsRef<Path>,
    name: &str,
    investigation_time: f64,
    sources: &[PointSource],
) -> HazGridResult<()> {
    let path = path.as_ref();
    if sources.is_empty() {
        return Err(HazGridError::InvalidConfig(
            "refusing to write an empty source model".to_string(),
        ));
    }

    let mut out = String::new();
    render(&mut out, name, investigation_time, sources)
        .expect("string formatting is infallible");
    std::fs::write(path, out)?;
    info!(
        "wrote source model {} ({} sources) to {}",
        name,
        sources.len(),
        path.display()
    );
    Ok(())
}

fn render(
    out: &mut String,
    name: &str,
    investigation_time: f64,
    sources: &[PointSource],
) -> fmt::Result {
    writeln!(out, r#"<?xml version="1.0" encoding="utf-8"?>"#)?;
    writeln!(
        out,
        r#"<nrml xmlns="http://openquake.org/xmlns/nrml/0.5" xmlns:gml="http://www.opengis.net/gml">"#
    )?;
    writeln!(
        out,
        r#"    <sourceModel name="{}" investigation_time="{}">"#,
        escape_xml(name),
        investigation_time
    )?;
    for source in sources {
        render_point_source(out, source)?;
    }
    writeln!(out, "    </sourceModel>")?;
    writeln!(out, "</nrml>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use hazgrid_core::config::SourceConfig;
    use hazgrid_core::magnitude::EvenlyDiscretizedMfd;
    use hazgrid_core::source::Location;

    fn sample_source(id: usize, dispersion: f64) -> PointSource {
        let config = SourceConfig::default();
        PointSource {
            id: format!("{:05}", id),
            name: format!("point{:05}", id),
            location: Location::new(174.1, -36.9),
            tectonic_region: config.tectonic_region.clone(),
            mfd: EvenlyDiscretizedMfd {
                min_mag: 5.0,
                bin_width: 1.0,
                occurrence_rates: vec![0.00909, 0.00091],
            },
            rupture_mesh_spacing: config.rupture_mesh_spacing,
            magnitude_scaling: config.magnitude_scaling,
            rupture_aspect_ratio: config.rupture_aspect_ratio,
            temporal_occurrence_model: TemporalOccurrenceModel::select(dispersion, 0.01, 1.0),
            upper_seismogenic_depth: config.upper_seismogenic_depth,
            lower_seismogenic_depth: config.lower_seismogenic_depth,
            nodal_plane_distribution: config.nodal_plane_distribution.clone(),
            hypocenter_distribution: config.hypocenter_distribution,
        }
    }

    #[test]
    fn writes_all_source_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("source.xml");
        let sources = vec![sample_source(0, 0.0), sample_source(1, 0.5)];
        write_source_model(&path, "Multiplicative", 1.0, &sources).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains(r#"<sourceModel name="Multiplicative" investigation_time="1">"#));
        assert!(text.contains(r#"<pointSource id="00000" name="point00000""#));
        assert!(text.contains("<gml:pos>174.1 -36.9</gml:pos>"));
        assert!(text.contains(r#"<incrementalMFD minMag="5" binWidth="1">"#));
        assert!(text.contains("<occurRates>0.00909 0.00091</occurRates>"));
        assert!(text.contains(r#"type="poisson" timeSpan="1""#));
        assert!(text.contains(r#"type="negative_binomial" timeSpan="1" mean="0.01" alpha="0.5""#));
        assert!(text.contains(r#"<nodalPlane probability="1" strike="0" dip="90" rake="0"/>"#));
        assert!(text.contains(r#"<hypoDepth probability="0.5" depth="10"/>"#));
        assert!(text.contains("</nrml>"));
    }

    #[test]
    fn model_name_is_escaped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("source.xml");
        write_source_model(&path, "a < b & c", 1.0, &[sample_source(0, 0.0)]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("a &lt; b &amp; c"));
    }

    #[test]
    fn rejects_empty_source_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("source.xml");
        assert!(matches!(
            write_source_model(&path, "empty", 1.0, &[]),
            Err(HazGridError::InvalidConfig(_))
        ));
        assert!(!path.exists());
    }
}
