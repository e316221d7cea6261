mod common;

use approx::assert_relative_eq;
use common::{CloudyFixture, Test, HALPHA, HBETA, LINES, MODEL_NAME, OIII};
use gaslight::{
    assembly::{self, manifest, AssemblyConfig, GridAssembler},
    config::{read_incident_axes, PhotoionisationConfig},
    error::GridError,
    grid::{fgd, point::GridPoint, Grid},
    io::{artifact::GridArtifact, OverwriteMode, Verbosity},
};

fn assemble(test: &Test, config: &AssemblyConfig) -> assembly::AssembledGrid {
    let photoionisation_config = PhotoionisationConfig::from_file(test.config_path()).unwrap();
    let incident_axes = read_incident_axes(test.incident_axes_path(), &Verbosity::Quiet).unwrap();
    let outputs = config.cloudy_outputs(test.output_dir(), MODEL_NAME);
    let assembler = GridAssembler::for_cloudy_outputs(
        incident_axes,
        photoionisation_config.axes().clone(),
        &outputs,
    )
    .unwrap();
    assembler.assemble(&outputs, config).unwrap()
}

fn default_config(test: &Test) -> AssemblyConfig {
    let photoionisation_config = PhotoionisationConfig::from_file(test.config_path()).unwrap();
    AssemblyConfig::new(photoionisation_config.cloudy_version().unwrap())
}

fn grid_path(test: &Test) -> std::path::PathBuf {
    test.grid_dir().join(format!("{}.glg", MODEL_NAME))
}

#[test]
fn assembled_grid_orders_incident_axes_first() {
    let test = Test::new();
    CloudyFixture::new(&test).write();
    let assembled = assemble(&test, &default_config(&test));

    assert_eq!(
        assembled.data.axes().axis_names(),
        vec!["log10age", "metallicity", "ionisation_parameter"]
    );
    assert_eq!(assembled.data.axes().shape(), vec![2, 2, 3]);
    assert_eq!(assembled.data.line_ids(), vec![HALPHA, HBETA, OIII]);
    assert!(assembled.failed_points.is_empty());
    assert!(assembled.continuum_spectra.is_none());
}

#[test]
fn assembled_luminosities_land_in_composite_cells() {
    let test = Test::new();
    CloudyFixture::new(&test).write();
    let assembled = assemble(&test, &default_config(&test));

    for (id, _, scale) in LINES {
        let line = assembled.data.line(id).unwrap();
        for photoionisation_row in 0..CloudyFixture::N_PHOTOIONISATION {
            for incident_row in 0..CloudyFixture::N_INCIDENT {
                // Incident row j covers (log10age, metallicity) with the first axis fastest
                let index = [incident_row % 2, incident_row / 2, photoionisation_row];
                assert!(line.valid[&index[..]]);
                assert_relative_eq!(
                    line.luminosity[&index[..]],
                    common::run_luminosity(scale, photoionisation_row, incident_row),
                    max_relative = 1e-9
                );
            }
        }
    }
}

#[test]
fn line_wavelengths_come_from_run_records() {
    let test = Test::new();
    CloudyFixture::new(&test).write();
    let assembled = assemble(&test, &default_config(&test));
    for (id, wavelength, _) in LINES {
        assert_relative_eq!(assembled.data.line(id).unwrap().wavelength, wavelength);
    }
}

#[test]
fn normalisation_divides_by_incident_gain() {
    let test = Test::new();
    let mut fixture = CloudyFixture::new(&test);
    fixture.incident_gain = 4.0;
    fixture.write();

    let normalised = assemble(&test, &default_config(&test));
    let mut config = default_config(&test);
    config.normalise = false;
    let raw = assemble(&test, &config);

    let normalised_line = normalised.data.line(HALPHA).unwrap();
    let raw_line = raw.data.line(HALPHA).unwrap();
    for (normalised, raw) in normalised_line
        .luminosity
        .iter()
        .zip(raw_line.luminosity.iter())
    {
        assert_relative_eq!(*normalised, raw / 4.0, max_relative = 1e-9);
    }
    let normalised_continuum = normalised_line.continuum.as_ref().unwrap();
    let raw_continuum = raw_line.continuum.as_ref().unwrap();
    for (normalised, raw) in normalised_continuum
        .nebular
        .iter()
        .zip(raw_continuum.nebular.iter())
    {
        assert_relative_eq!(*normalised, raw / 4.0, max_relative = 1e-9);
    }
}

#[test]
fn normalisation_with_matching_incident_is_identity() {
    let test = Test::new();
    CloudyFixture::new(&test).write();
    let assembled = assemble(&test, &default_config(&test));
    let line = assembled.data.line(OIII).unwrap();
    assert_relative_eq!(
        line.luminosity[&[1, 1, 2][..]],
        common::run_luminosity(8e39, 2, 3),
        max_relative = 1e-9
    );
}

#[test]
fn missing_upstream_incident_aborts_normalised_assembly() {
    let test = Test::new();
    let fixture = CloudyFixture::new(&test);
    fixture.write();
    std::fs::remove_file(fixture.root.join("2.ssed.npy")).unwrap();

    let photoionisation_config = PhotoionisationConfig::from_file(test.config_path()).unwrap();
    let config = default_config(&test);
    let outputs = config.cloudy_outputs(test.output_dir(), MODEL_NAME);
    let assembler = GridAssembler::for_cloudy_outputs(
        read_incident_axes(test.incident_axes_path(), &Verbosity::Quiet).unwrap(),
        photoionisation_config.axes().clone(),
        &outputs,
    )
    .unwrap();
    assert!(assembler.assemble(&outputs, &config).is_err());
}

#[test]
fn written_grid_loads_back_unchanged() {
    let test = Test::new();
    CloudyFixture::new(&test).write();
    let assembled = assemble(&test, &default_config(&test));
    assembled
        .write(
            test.grid_dir(),
            MODEL_NAME,
            "glg",
            OverwriteMode::Never,
            &Verbosity::Quiet,
        )
        .unwrap();

    let grid = Grid::load::<_, &str>(grid_path(&test), None, &Verbosity::Quiet).unwrap();
    assert_eq!(grid.name(), MODEL_NAME);
    assert_eq!(grid.data(), &assembled.data);
    assert!(grid.has_continuum());
    assert_eq!(grid.n_failed_models(), 0);
    assert!(!manifest::manifest_path(test.grid_dir(), MODEL_NAME).exists());
}

#[test]
fn writing_existing_grid_requires_overwrite() {
    let test = Test::new();
    CloudyFixture::new(&test).write();
    let assembled = assemble(&test, &default_config(&test));
    let write = |overwrite_mode| {
        assembled.write(
            test.grid_dir(),
            MODEL_NAME,
            "glg",
            overwrite_mode,
            &Verbosity::Quiet,
        )
    };
    write(OverwriteMode::Never).unwrap();
    assert!(write(OverwriteMode::Never).is_err());
    write(OverwriteMode::Always).unwrap();
}

#[test]
fn failed_run_is_listed_and_invalid_after_loading() {
    let test = Test::new();
    let mut fixture = CloudyFixture::new(&test);
    fixture.failed.insert((1, 2));
    fixture.write();

    let assembled = assemble(&test, &default_config(&test));
    assert_eq!(assembled.failed_points, vec![(1, 2)]);
    assembled
        .write(
            test.grid_dir(),
            MODEL_NAME,
            "glg",
            OverwriteMode::Never,
            &Verbosity::Quiet,
        )
        .unwrap();

    let manifest_path = manifest::manifest_path(test.grid_dir(), MODEL_NAME);
    common::assert_file_exists(&manifest_path);
    assert_eq!(manifest::read_failed_points(&manifest_path).unwrap(), vec![(1, 2)]);

    let grid = Grid::load(grid_path(&test), Some(&[HALPHA][..]), &Verbosity::Quiet).unwrap();
    assert_eq!(grid.n_failed_models(), 1);

    // Incident row 2 is (log10age index 0, metallicity index 1)
    let failed_index = vec![0, 1, 1];
    assert!(grid.failed_models()[&failed_index[..]]);
    let luminosity = grid.data().line(HALPHA).unwrap().luminosity[&failed_index[..]];
    assert!(luminosity.is_nan());
    assert!(matches!(
        grid.get_line_at_grid_point(&GridPoint::ByIndex(failed_index.clone()), HALPHA, 1.0, 1.0),
        Err(GridError::FailedGridPoint(index)) if index == failed_index
    ));

    let line = grid
        .get_line_at_grid_point(&GridPoint::ByIndex(vec![0, 1, 0]), HALPHA, 1.0, 1.0)
        .unwrap();
    assert_relative_eq!(
        line.luminosity,
        common::run_luminosity(1e40, 0, 2),
        max_relative = 1e-9
    );
}

#[test]
fn rerun_without_failures_clears_manifest() {
    let test = Test::new();
    let mut fixture = CloudyFixture::new(&test);
    fixture.failed.insert((2, 0));
    fixture.write();
    let write = |assembled: &assembly::AssembledGrid, overwrite_mode| {
        assembled
            .write(
                test.grid_dir(),
                MODEL_NAME,
                "glg",
                overwrite_mode,
                &Verbosity::Quiet,
            )
            .unwrap()
    };
    write(&assemble(&test, &default_config(&test)), OverwriteMode::Never);
    let manifest_path = manifest::manifest_path(test.grid_dir(), MODEL_NAME);
    common::assert_file_exists(&manifest_path);

    fixture.failed.clear();
    fixture.write();
    let assembled = assemble(&test, &default_config(&test));
    assert!(assembled.failed_points.is_empty());
    write(&assembled, OverwriteMode::Always);
    assert!(!manifest_path.exists());

    let grid = Grid::load(grid_path(&test), None::<&[&str]>, &Verbosity::Quiet).unwrap();
    assert_eq!(grid.n_failed_models(), 0);
}

#[test]
fn continuum_spectra_are_saved_on_request() {
    let test = Test::new();
    let mut fixture = CloudyFixture::new(&test);
    fixture.failed.insert((0, 0));
    fixture.write();

    let mut config = default_config(&test);
    config.save_continuum = true;
    let assembled = assemble(&test, &config);
    assembled
        .write(
            test.grid_dir(),
            MODEL_NAME,
            "glg",
            OverwriteMode::Never,
            &Verbosity::Quiet,
        )
        .unwrap();

    let spectra_path = test.grid_dir().join(format!("{}-continuum.glg", MODEL_NAME));
    common::assert_file_exists(&spectra_path);
    let artifact = GridArtifact::read(&spectra_path, &Verbosity::Quiet).unwrap();

    let n_wavelengths = common::CONTINUUM_WAVELENGTHS.len();
    assert_eq!(
        artifact
            .dataset(assembly::SPECTRA_WAVELENGTH_DATASET)
            .unwrap()
            .shape(),
        &[n_wavelengths]
    );
    assert_eq!(
        artifact
            .dataset(assembly::SPECTRA_TRANSMISSION_DATASET)
            .unwrap()
            .shape(),
        &[2, 2, 3, n_wavelengths]
    );

    let spectra = assembled.continuum_spectra.as_ref().unwrap();
    assert_eq!(spectra.wavelength.len(), n_wavelengths);
    assert_eq!(spectra.transmission.shape(), &[2, 2, 3, n_wavelengths]);
    assert!(!spectra.valid[&[0, 0, 0][..]]);
    assert!(spectra.valid[&[1, 0, 0][..]]);
    assert!(spectra.transmission[&[0, 0, 0, 0][..]].is_nan());
    for &transmission in spectra.transmission.slice(ndarray::s![1, 0, 0, ..]).iter() {
        assert_relative_eq!(transmission, 0.5, max_relative = 1e-9);
    }
}

#[test]
fn interpolation_at_grid_nodes_matches_lookup() {
    let test = Test::new();
    CloudyFixture::new(&test).write();
    assemble(&test, &default_config(&test))
        .write(
            test.grid_dir(),
            MODEL_NAME,
            "glg",
            OverwriteMode::Never,
            &Verbosity::Quiet,
        )
        .unwrap();

    let mut grid = Grid::load::<_, &str>(grid_path(&test), None, &Verbosity::Quiet).unwrap();
    let parameters = "log10age=7.0,metallicity=0.01,ionisation_parameter=0.01"
        .parse()
        .unwrap();
    let nearest = grid
        .get_line_at_grid_point(&GridPoint::ByParameters(parameters), HBETA, 1.0, 1.0)
        .unwrap();

    let parameters = "log10age=7.0,metallicity=0.01,ionisation_parameter=0.01"
        .parse()
        .unwrap();
    let interpolated = grid
        .get_interpolated_line(
            &parameters,
            HBETA,
            &gaslight::grid::Log10Axes::explicit(&["ionisation_parameter"]),
        )
        .unwrap();
    assert_relative_eq!(interpolated.luminosity, nearest.luminosity, max_relative = 1e-9);
    assert_relative_eq!(
        nearest.luminosity,
        common::run_luminosity(3.5e39, 1, 1),
        max_relative = 1e-9
    );
}

#[cfg(feature = "cli")]
mod cli {
    use super::*;
    use common::run;

    fn create_grid(test: &Test, extra_args: &[&str]) {
        let mut args = vec![
            "gaslight".to_string(),
            "create".to_string(),
            format!("--incident-grid={}", test.incident_axes_path().display()),
            format!("--config={}", test.config_path().display()),
            format!("--output-dir={}", test.output_dir().display()),
            format!("--grid-dir={}", test.grid_dir().display()),
        ];
        args.extend(extra_args.iter().map(|arg| arg.to_string()));
        run(args);
    }

    #[test]
    fn create_writes_grid_and_manifest() {
        let test = Test::new();
        let mut fixture = CloudyFixture::new(&test);
        fixture.failed.insert((2, 3));
        fixture.write();

        create_grid(&test, &["--save-continuum"]);

        common::assert_file_exists(grid_path(&test));
        common::assert_file_exists(test.grid_dir().join(format!("{}-continuum.glg", MODEL_NAME)));
        let manifest_path = manifest::manifest_path(test.grid_dir(), MODEL_NAME);
        assert_eq!(manifest::read_failed_points(manifest_path).unwrap(), vec![(2, 3)]);

        let grid = Grid::load::<_, &str>(grid_path(&test), None, &Verbosity::Quiet).unwrap();
        assert_eq!(grid.shape(), vec![2, 2, 3]);
        assert!(grid.failed_models()[&[1, 1, 2][..]]);
    }

    #[test]
    fn create_then_inspect_subset_and_query() {
        let test = Test::new();
        CloudyFixture::new(&test).write();
        create_grid(&test, &["--no-normalise"]);

        let grid = grid_path(&test).display().to_string();
        run(["gaslight", "inspect", &grid, "--list-lines", "--list-failed"]);

        let subset_path = test.grid_dir().join("subset.glg");
        let subset = subset_path.display().to_string();
        run([
            "gaslight",
            "subset",
            &grid,
            &format!("--output={}", subset),
            &format!("--lines={},{}", HALPHA, OIII),
        ]);
        let subset_grid = Grid::load::<_, &str>(&subset_path, None, &Verbosity::Quiet).unwrap();
        assert_eq!(subset_grid.line_ids(), vec![HALPHA, OIII]);
        assert_eq!(subset_grid.shape(), vec![2, 2, 3]);

        run([
            "gaslight",
            "query",
            &subset,
            "--indices=1,0,2",
            "--covering-fraction=0.5",
        ]);
        run([
            "gaslight",
            "query",
            &subset,
            "--parameters=log10age=6.5,metallicity=0.015,ionisation_parameter=0.01",
            "--interpolate",
            "--log10-axes=ionisation_parameter",
            "--yaml",
        ]);
    }

    #[test]
    fn parameters_prints_every_model() {
        let test = Test::new();
        let config = test.config_path().display().to_string();
        run(["gaslight", "parameters", &config]);
        run(["gaslight", "parameters", &config, "--row=2"]);
    }
}

#[test]
fn subset_keeps_values_of_selected_lines() {
    let test = Test::new();
    CloudyFixture::new(&test).write();
    let assembled = assemble(&test, &default_config(&test));
    let subset = assembled.data.subset(&[OIII]).unwrap();
    assert_eq!(subset.line_ids(), vec![OIII]);
    assert_eq!(subset.line(OIII).unwrap(), assembled.data.line(OIII).unwrap());
    assert!(matches!(
        subset.line(HALPHA),
        Err(GridError::UnknownLine(_))
    ));
}

#[test]
fn equivalent_widths_follow_luminosity_over_continuum() {
    let test = Test::new();
    CloudyFixture::new(&test).write();
    let assembled = assemble(&test, &default_config(&test));
    let mut grid = Grid::new(MODEL_NAME, assembled.data);

    let line = grid
        .get_line_at_grid_point(&GridPoint::ByIndex(vec![1, 0, 2]), HALPHA, 1.0, 1.0)
        .unwrap();
    let continuum = grid.data().line(HALPHA).unwrap().continuum.clone().unwrap();
    let continuum_density = (continuum.nebular[&[1, 0, 2][..]]
        + continuum.transmitted[&[1, 0, 2][..]])
        * gaslight::constants::CLIGHT_ANGSTROM
        / (line.wavelength * line.wavelength);

    let widths = grid.calculate_equivalent_widths(0.0).unwrap();
    let halpha_widths = &widths.widths[HALPHA];
    assert_eq!(halpha_widths.shape(), &[2, 2, 3]);
    assert!(halpha_widths.iter().all(|width: &fgd| width.is_finite() && *width > 0.0));
    assert_relative_eq!(
        halpha_widths[&[1, 0, 2][..]],
        line.luminosity / continuum_density,
        max_relative = 1e-9
    );
}
