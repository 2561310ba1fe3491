use super::prepare_surface;
use crate::cli::SampleArgs;
use crate::config;
use crate::error::Result;
use crate::io::xyz::XyzFile;
use crate::utils::progress::CliProgressHandler;
use adspack::engine::conformation::Conformation;
use adspack::engine::progress::ProgressReporter;
use adspack::workflows;
use std::fs::File;
use std::io::{BufWriter, Write};
use tracing::{debug, info, warn};

pub fn run(args: SampleArgs) -> Result<()> {
    let job = config::build_sample_job(&args)?;
    debug!(
        adsorbates = job.adsorbates.len(),
        conformations = job.sampling.num_conformations,
        sessions = job.sampling.num_sessions,
        "Sample job assembled."
    );

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Preparing surface...");
    let (substrate, catalog) = prepare_surface(&job.surface, &reporter)?;

    println!(
        "Sampling {} conformation(s) of {} adsorbate(s)...",
        job.sampling.num_conformations,
        job.adsorbates.len()
    );
    info!("Invoking the core sampling workflow...");
    let conformations =
        workflows::sample::run(&substrate, &catalog, &job.adsorbates, &job.sampling, &reporter)?;

    if conformations.is_empty() {
        warn!("Workflow completed but produced no conformations.");
        println!("Warning: sampling finished but produced no conformations.");
        return Ok(());
    }

    info!(
        "Writing {} conformation(s) to {:?}",
        conformations.len(),
        &args.output
    );
    let mut writer = BufWriter::new(File::create(&args.output)?);
    write_conformations(&mut writer, &conformations)?;
    writer.flush()?;

    println!(
        "✓ {} conformation(s) written to: {}",
        conformations.len(),
        args.output.display()
    );
    Ok(())
}

fn write_conformations(out: &mut impl Write, conformations: &[Conformation]) -> Result<()> {
    for (i, conformation) in conformations.iter().enumerate() {
        let comment = format!(
            "conformation={} adsorbate_atoms={}",
            i,
            conformation.adsorbate_atom_count()
        );
        XyzFile::write_frame(
            out,
            &comment,
            conformation
                .atoms
                .iter()
                .map(|a| (a.element.as_str(), a.position)),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::write_square_slab;
    use std::fs;
    use std::io::BufReader;
    use std::path::PathBuf;
    use tempfile::tempdir;

    const JOB: &str = r#"
        [substrate]
        path = "slab.xyz"

        [sites]
        types = ["vertex"]

        [packing]
        seed = 3

        [sampling]
        conformations = 4
        sessions = 2

        [[adsorbates]]
        name = "H"
        site = "vertex"
        atoms = [{ element = "H", position = [0.0, 0.0, 0.0] }]
        count = 2
    "#;

    fn args(dir: &std::path::Path, output: PathBuf) -> SampleArgs {
        write_square_slab(dir);
        let config = dir.join("job.toml");
        fs::write(&config, JOB).unwrap();
        SampleArgs {
            config,
            output,
            conformations: None,
            sessions: None,
            seed: None,
            no_randomize: false,
            set_values: vec![],
        }
    }

    #[test]
    fn run_writes_one_frame_per_conformation() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("out.xyz");
        run(args(dir.path(), output.clone())).unwrap();

        let mut reader = BufReader::new(File::open(&output).unwrap());
        let frames = XyzFile::read_frames(&mut reader).unwrap();
        assert_eq!(frames.len(), 4);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.atoms.len(), 11);
            assert_eq!(frame.comment, format!("conformation={i} adsorbate_atoms=2"));
            assert!(frame.atoms[..9].iter().all(|a| a.element == "Pt"));
            assert!(frame.atoms[9..].iter().all(|a| a.element == "H"));
        }
    }

    #[test]
    fn seeded_runs_write_identical_files() {
        let dir = tempdir().unwrap();
        let (first, second) = (dir.path().join("a.xyz"), dir.path().join("b.xyz"));
        run(args(dir.path(), first.clone())).unwrap();
        run(args(dir.path(), second.clone())).unwrap();

        assert_eq!(
            fs::read_to_string(first).unwrap(),
            fs::read_to_string(second).unwrap()
        );
    }
}
