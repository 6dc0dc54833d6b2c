//! Recording stand-in for the external tools.
//!
//! Each program is simulated by producing the files the real tool would,
//! so the pipeline sees the same filesystem transitions.

#![allow(dead_code)]

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use synbrowse_core::{CommandError, CommandRunner, Dataset, Invocation, RunSettings};

pub const GFF_BODY: &str = "##gff-version 3\n\
    NC_1\tRefSeq\tgene\t500\t900\t.\t+\t.\tID=b\n\
    NC_1\tRefSeq\tgene\t10\t300\t.\t+\t.\tID=a\n";

pub const MAF_BODY: &str = "##maf version=1\n\
    a score=120\n\
    s NC_019843.3 100 10 + 30119 ACGTACGTAC\n\
    s NC_045512.2 250 10 + 29903 ACGTACGTAC\n\
    \n\
    a score=80\n\
    s NC_019843.3 5 4 + 30119 ACGT\n\
    s NC_045512.2 20 4 - 29903 ACGT\n";

#[derive(Default)]
pub struct FakeTools {
    log: RefCell<Vec<Invocation>>,
    /// remaining forced failures keyed by "program" or "program subcommand"
    failures: RefCell<HashMap<String, usize>>,
    missing: HashSet<String>,
    /// "program" or "program subcommand" keys that fail to start at all
    unstartable: HashSet<String>,
    /// URLs that serve an HTML error page instead of data
    broken_urls: HashSet<String>,
}

pub fn gzip(content: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(content).unwrap();
    encoder.finish().unwrap()
}

pub fn gunzip(path: &Path) -> String {
    let mut out = String::new();
    MultiGzDecoder::new(fs::File::open(path).unwrap())
        .read_to_string(&mut out)
        .unwrap();
    out
}

fn strip_suffix(path: &Path, suffix: &str) -> PathBuf {
    let s = path.to_string_lossy();
    PathBuf::from(s.strip_suffix(suffix).unwrap_or(&s).to_string())
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    PathBuf::from(format!("{}{}", path.display(), suffix))
}

impl FakeTools {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(self, key: &str, times: usize) -> Self {
        self.failures.borrow_mut().insert(key.to_string(), times);
        self
    }

    pub fn without(mut self, program: &str) -> Self {
        self.missing.insert(program.to_string());
        self
    }

    pub fn unstartable(mut self, key: &str) -> Self {
        self.unstartable.insert(key.to_string());
        self
    }

    pub fn broken_url(mut self, url: &str) -> Self {
        self.broken_urls.insert(url.to_string());
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.log.borrow().clone()
    }

    pub fn count(&self) -> usize {
        self.log.borrow().len()
    }

    /// Invocations whose rendered command line contains `needle`
    pub fn matching(&self, needle: &str) -> Vec<String> {
        self.log
            .borrow()
            .iter()
            .map(|i| i.to_string())
            .filter(|line| line.contains(needle))
            .collect()
    }

    fn keys(invocation: &Invocation) -> Vec<String> {
        let mut keys: Vec<String> = invocation
            .args
            .first()
            .map(|a| format!("{} {}", invocation.program, a.to_string_lossy()))
            .into_iter()
            .collect();
        keys.push(invocation.program.clone());
        keys
    }

    fn take_failure(&self, invocation: &Invocation) -> bool {
        let mut failures = self.failures.borrow_mut();
        for key in Self::keys(invocation) {
            if let Some(remaining) = failures.get_mut(&key) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return true;
                }
            }
        }
        false
    }

    fn simulate(&self, inv: &Invocation) -> std::io::Result<()> {
        let args: Vec<String> = inv.args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        match inv.program.as_str() {
            "wget" => {
                // wget <url> -O <dest>
                self.fetch(&args[0], Path::new(&args[2]))
            }
            "curl" => {
                // curl -fsSL -o <dest> <url>
                self.fetch(&args[3], Path::new(&args[2]))
            }
            "gunzip" => {
                let gz = Path::new(&args[1]);
                fs::write(strip_suffix(gz, ".gz"), gunzip(gz))?;
                fs::remove_file(gz)
            }
            "sort" => {
                let source = fs::read_to_string(&args[2])?;
                let (mut headers, mut rows): (Vec<&str>, Vec<&str>) =
                    source.lines().partition(|l| l.starts_with('#'));
                rows.sort_by_key(|l| {
                    let cols: Vec<&str> = l.split('\t').collect();
                    (cols[0].to_string(), cols.get(3).and_then(|c| c.parse::<u64>().ok()).unwrap_or(0))
                });
                headers.extend(rows);
                fs::write(inv.stdout.as_ref().unwrap(), headers.join("\n") + "\n")
            }
            "bgzip" => {
                let source = fs::read(&args[1])?;
                fs::write(inv.stdout.as_ref().unwrap(), gzip(&source))
            }
            "tabix" => {
                let gz = Path::new(args.last().unwrap());
                fs::write(with_suffix(gz, ".tbi"), b"TBI\x01")
            }
            "samtools" => fs::write(with_suffix(Path::new(&args[1]), ".fai"), b"seq\t10\t5\t60\t61\n"),
            "lastdb" => fs::write(with_suffix(Path::new(&args[0]), ".prj"), b"version=1\n"),
            "lastal" => fs::write(inv.stdout.as_ref().unwrap(), MAF_BODY),
            "jbrowse" => match args[0].as_str() {
                "create" => fs::create_dir_all(&args[1]),
                "text-index" => fs::create_dir_all(Path::new(&args[2]).join("trix")),
                _ => Ok(()),
            },
            other => panic!("unexpected program {other}"),
        }
    }

    fn fetch(&self, url: &str, dest: &Path) -> std::io::Result<()> {
        let body: &[u8] = if self.broken_urls.contains(url) {
            b"<html>404 Not Found</html>\n"
        } else if url.ends_with(".gff.gz") {
            GFF_BODY.as_bytes()
        } else {
            b">NC_1 test genome\nACGTACGTAC\n"
        };
        fs::write(dest, gzip(body))
    }
}

impl CommandRunner for FakeTools {
    fn run(&self, invocation: &Invocation) -> Result<(), CommandError> {
        self.log.borrow_mut().push(invocation.clone());

        if Self::keys(invocation).iter().any(|key| self.unstartable.contains(key)) {
            return Err(CommandError::Spawn {
                program: invocation.program.clone(),
                message: "simulated spawn failure".to_string(),
            });
        }

        if self.take_failure(invocation) {
            return Err(CommandError::Exit {
                program: invocation.program.clone(),
                code: Some(1),
                stderr: "simulated failure".to_string(),
            });
        }

        self.simulate(invocation).map_err(|e| CommandError::Exit {
            program: invocation.program.clone(),
            code: Some(2),
            stderr: e.to_string(),
        })
    }

    fn is_available(&self, program: &str) -> bool {
        !self.missing.contains(program)
    }
}

/// Default MERS / SARS-CoV-2 settings writing into `root/jbrowse2`
pub fn settings_in(root: &Path) -> RunSettings {
    RunSettings {
        output_dir: root.join("jbrowse2"),
        ..RunSettings::default()
    }
}

pub fn dataset<'a>(settings: &'a RunSettings, key: &str) -> &'a Dataset {
    settings.dataset(key).unwrap()
}

pub fn read_config(settings: &RunSettings) -> serde_json::Value {
    let raw = fs::read_to_string(settings.output_dir.join("config.json")).unwrap();
    serde_json::from_str(&raw).unwrap()
}
