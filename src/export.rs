//! OBJ export of reconstructions.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Write a triangle mesh as a Wavefront OBJ file.
///
/// Face indices are 0-based in memory and written 1-based.
pub fn save_obj(path: &Path, vertices: &[[f32; 3]], faces: &[[u32; 3]]) -> Result<()> {
    let mut writer = BufWriter::new(fs::File::create(path)?);
    for v in vertices {
        writeln!(writer, "v {} {} {}", v[0], v[1], v[2])?;
    }
    for f in faces {
        writeln!(writer, "f {} {} {}", f[0] + 1, f[1] + 1, f[2] + 1)?;
    }
    Ok(())
}

/// Exports test-set meshes grouped by attribute-swap outcome.
///
/// Per sample it writes the reconstruction, the ground truth, and the swapped
/// reconstruction into a success or failure directory.
pub struct SwapExport {
    success_dir: PathBuf,
    failed_dir: PathBuf,
    faces: Vec<[u32; 3]>,
}

impl SwapExport {
    /// Create the per-fold export directories under `checkpoint_dir`.
    pub fn new(checkpoint_dir: &Path, fold: usize, faces: Vec<[u32; 3]>) -> Result<Self> {
        let base = checkpoint_dir.join(format!("mesh_{fold}"));
        let success_dir = base.join("swap_success");
        let failed_dir = base.join("swap_failed");
        fs::create_dir_all(&success_dir)?;
        fs::create_dir_all(&failed_dir)?;
        Ok(Self {
            success_dir,
            failed_dir,
            faces,
        })
    }

    /// Write one sample's meshes into the directory matching `success`.
    pub fn write_sample(
        &self,
        name: &str,
        reconstruction: &[[f32; 3]],
        ground_truth: &[[f32; 3]],
        swapped: &[[f32; 3]],
        success: bool,
    ) -> Result<()> {
        let dir = if success {
            &self.success_dir
        } else {
            &self.failed_dir
        };
        save_obj(&dir.join(format!("{name}_recon.obj")), reconstruction, &self.faces)?;
        save_obj(&dir.join(format!("{name}_gt.obj")), ground_truth, &self.faces)?;
        save_obj(&dir.join(format!("{name}.obj")), swapped, &self.faces)?;
        Ok(())
    }
}
