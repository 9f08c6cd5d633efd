//! Node2vec embedding delegated to an external executable (N2V).
//!
//! The graph is relabeled with integer node ranks and written as a whitespace separated edge list.
//! The executable is run on it and writes a text file with a header line then one line by node :
//! `rank v1 v2 ... vK`. Ranks are mapped back to node identities.
//!
//! Exchange files live in a temporary directory removed on every exit path.
//! The executable is behind the [Node2VecRunner] trait, [CommandRunner] spawns it and kills it after a timeout.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, SystemTime};

use cpu_time::ProcessTime;
use indexmap::IndexSet;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::embedder::{EmbedderT, N2V};
use crate::embedding::EmbeddingTable;
use crate::errors::{EmbedError, Result};
use crate::graph::KGraph;

/// name of the edge list given to the executable
const INPUT_NAME: &str = "graph.edgelist";
/// name of the file the executable must produce
const OUTPUT_NAME: &str = "graph.emb";

/// interval between 2 checks of the external process
const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node2VecParams {
    /// path to the node2vec executable
    executable: PathBuf,
    /// length of walks
    walk_length: usize,
    /// dimension of embedded vectors
    dimension: usize,
    /// number of walks by node
    walks_per_node: usize,
    /// return parameter
    p: f64,
    /// graph is directed
    directed: bool,
    /// verbose output of executable
    verbose: bool,
    /// the process is killed after this delay (seconds)
    timeout_secs: u64,
} // end of Node2VecParams

impl Node2VecParams {
    pub fn new(executable: &Path, walk_length: usize, dimension: usize, walks_per_node: usize, p: f64) -> Self {
        Node2VecParams {
            executable: executable.to_path_buf(),
            walk_length,
            dimension,
            walks_per_node,
            p,
            directed: true,
            verbose: true,
            timeout_secs: 3600,
        }
    }

    pub fn get_executable(&self) -> &Path {
        &self.executable
    }

    pub fn set_executable(&mut self, executable: &Path) {
        self.executable = executable.to_path_buf();
    }

    pub fn get_dimension(&self) -> usize {
        self.dimension
    }

    pub fn get_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn set_timeout_secs(&mut self, timeout_secs: u64) {
        self.timeout_secs = timeout_secs;
    }

    /// command line arguments of the executable
    pub fn get_args(&self, input: &Path, output: &Path, epochs: usize) -> Vec<String> {
        let mut args = vec![
            format!("-i:{}", input.display()),
            format!("-o:{}", output.display()),
            format!("-e:{}", epochs),
            format!("-l:{}", self.walk_length),
            format!("-d:{}", self.dimension),
            format!("-r:{}", self.walks_per_node),
            format!("-p:{}", self.p),
        ];
        if self.directed {
            args.push(String::from("-dr"));
        }
        if self.verbose {
            args.push(String::from("-v"));
        }
        args
    } // end of get_args
} // end of impl Node2VecParams

impl Default for Node2VecParams {
    fn default() -> Self {
        Node2VecParams::new(Path::new("node2vec"), 50, 100, 5, 0.3)
    }
}

//=====================================================================================

/// Something that runs node2vec on the edge list `input` and writes vectors in `output`.
pub trait Node2VecRunner {
    /// must return when the run is finished, and Err if it failed
    fn run(&self, input: &Path, output: &Path, epochs: usize) -> Result<()>;
}

/// runs the executable of [Node2VecParams] as a child process
pub struct CommandRunner {
    params: Node2VecParams,
}

impl CommandRunner {
    pub fn new(params: Node2VecParams) -> Self {
        CommandRunner { params }
    }
}

impl Node2VecRunner for CommandRunner {
    fn run(&self, input: &Path, output: &Path, epochs: usize) -> Result<()> {
        let args = self.params.get_args(input, output, epochs);
        log::info!("running {:?} {}", self.params.get_executable(), args.join(" "));
        let mut child = Command::new(self.params.get_executable())
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .spawn()
            .map_err(|e| {
                log::error!("could not launch {:?}", self.params.get_executable());
                EmbedError::training(
                    N2V,
                    format!("could not launch {} : {}", self.params.get_executable().display(), e),
                )
            })?;
        let start = SystemTime::now();
        let timeout = self.params.get_timeout();
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    if status.success() {
                        log::info!("node2vec process finished");
                        return Ok(());
                    }
                    log::error!("node2vec process exited with {}", status);
                    return Err(EmbedError::training(N2V, format!("external process failed, {}", status)));
                }
                Ok(None) => {
                    let elapsed = start.elapsed().unwrap_or_default();
                    if elapsed >= timeout {
                        log::error!("node2vec process still running after {:?}, killing it", timeout);
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(EmbedError::training(
                            N2V,
                            format!("external process killed after timeout of {:?}", timeout),
                        ));
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(EmbedError::training(N2V, format!("could not wait external process : {}", e)));
                }
            }
        }
    } // end of run
} // end of impl Node2VecRunner for CommandRunner

//=====================================================================================

// writes edges with node ranks, one edge by line
fn write_edgelist(graph: &KGraph, nodes: &IndexSet<String>, path: &Path) -> std::io::Result<usize> {
    let file = OpenOptions::new().write(true).create(true).truncate(true).open(path)?;
    let mut bufwriter = BufWriter::new(file);
    let mut nb_edges = 0;
    for (source, _, target) in graph.edges() {
        // all ids come from the graph
        if let (Some(s), Some(t)) = (nodes.get_index_of(source), nodes.get_index_of(target)) {
            writeln!(bufwriter, "{} {}", s, t)?;
            nb_edges += 1;
        }
    }
    bufwriter.flush()?;
    Ok(nb_edges)
} // end of write_edgelist

/// parses the executable output. The header line is skipped, all vectors must have the same length.
fn read_vectors(path: &Path, nodes: &IndexSet<String>) -> Result<(IndexSet<String>, Array2<f32>)> {
    let bad = |msg: String| EmbedError::training(N2V, msg);
    let file = OpenOptions::new()
        .read(true)
        .open(path)
        .map_err(|e| bad(format!("no output file produced ({})", e)))?;
    let reader = BufReader::new(file);
    let mut indexation = IndexSet::<String>::new();
    let mut values = Vec::<f32>::new();
    let mut dim: Option<usize> = None;
    for (num, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| bad(format!("could not read output line {} : {}", num, e)))?;
        // header
        if num == 0 || line.trim().is_empty() {
            continue;
        }
        let mut fields = line.split_whitespace();
        let rank: usize = fields
            .next()
            .and_then(|f| f.parse().ok())
            .ok_or_else(|| bad(format!("output line {} has no node id", num)))?;
        let node_id = nodes
            .get_index(rank)
            .ok_or_else(|| bad(format!("output line {} has unknown node id {}", num, rank)))?;
        let before = values.len();
        for f in fields {
            let x: f32 = f
                .parse()
                .map_err(|_| bad(format!("output line {} has bad value {}", num, f)))?;
            values.push(x);
        }
        let len = values.len() - before;
        if len != *dim.get_or_insert(len) || len == 0 {
            return Err(bad(format!("output line {} has a vector of length {}", num, len)));
        }
        if !indexation.insert(node_id.clone()) {
            return Err(bad(format!("node {} output twice", rank)));
        }
    }
    let dim = dim.ok_or_else(|| bad(String::from("output file has no vector")))?;
    let data = Array2::from_shape_vec((indexation.len(), dim), values)
        .map_err(|e| bad(format!("bad output shape : {}", e)))?;
    Ok((indexation, data))
} // end of read_vectors

/// The N2V strategy
pub struct Node2VecEmbedder {
    params: Node2VecParams,
    runner: Box<dyn Node2VecRunner>,
}

impl Node2VecEmbedder {
    pub fn new(params: Node2VecParams, runner: Box<dyn Node2VecRunner>) -> Self {
        Node2VecEmbedder { params, runner }
    }
}

impl EmbedderT for Node2VecEmbedder {
    fn name(&self) -> &'static str {
        N2V
    }

    fn embed(&mut self, graph: &KGraph, epochs: usize) -> Result<EmbeddingTable> {
        //
        log::info!("Node2VecEmbedder::embed, epochs : {}", epochs);
        let cpu_start = ProcessTime::now();
        let sys_start = SystemTime::now();
        //
        let nodes: IndexSet<String> = graph.node_ids().map(|s| s.to_string()).collect();
        // removed when dropped, whatever the exit path
        let tmpdir = tempfile::Builder::new()
            .prefix("kgembed-n2v")
            .tempdir()
            .map_err(|e| EmbedError::training(N2V, format!("could not create temporary directory : {}", e)))?;
        let input = tmpdir.path().join(INPUT_NAME);
        let output = tmpdir.path().join(OUTPUT_NAME);
        let nb_edges = write_edgelist(graph, &nodes, &input)
            .map_err(|e| EmbedError::training(N2V, format!("could not write edge list : {}", e)))?;
        log::debug!("wrote {} edges in {:?}", nb_edges, input);
        self.runner.run(&input, &output, epochs)?;
        let (indexation, data) = read_vectors(&output, &nodes)?;
        if data.ncols() != self.params.get_dimension() {
            log::warn!(
                "node2vec produced vectors of dim {}, asked {}",
                data.ncols(),
                self.params.get_dimension()
            );
        }
        log::info!(
            "Node2VecEmbedder::embed got {} vectors, sys time(ms) {:?} cpu time(ms) {:?}",
            indexation.len(),
            sys_start.elapsed().map(|d| d.as_millis()).unwrap_or(0),
            cpu_start.elapsed().as_millis()
        );
        EmbeddingTable::new(N2V, indexation, data)
    } // end of embed
} // end of impl EmbedderT for Node2VecEmbedder

//=====================================================================================

#[cfg(test)]
mod tests {

    use super::*;
    use std::sync::{Arc, Mutex, MutexGuard};

    use crate::graph::testgraph;

    // tests writing or launching executables run one at a time : a script still open for
    // writing in one thread when another thread forks cannot be executed (ETXTBSY)
    static PROCESS_LOCK: Mutex<()> = Mutex::new(());

    fn process_lock() -> MutexGuard<'static, ()> {
        PROCESS_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    /// writes a vector for each node seen in the edge list and records the directory it worked in
    struct FakeRunner {
        seen_dir: Arc<Mutex<Option<PathBuf>>>,
        fail: bool,
    }

    impl Node2VecRunner for FakeRunner {
        fn run(&self, input: &Path, output: &Path, _epochs: usize) -> Result<()> {
            *self.seen_dir.lock().unwrap() = input.parent().map(|p| p.to_path_buf());
            if self.fail {
                return Err(EmbedError::training(N2V, "fake failure"));
            }
            let content = std::fs::read_to_string(input).unwrap();
            let mut ids = IndexSet::<usize>::new();
            for line in content.lines() {
                for f in line.split_whitespace() {
                    ids.insert(f.parse().unwrap());
                }
            }
            let mut out = format!("{} 3\n", ids.len());
            for id in ids {
                out.push_str(&format!("{} {} 0.5 -1\n", id, id));
            }
            std::fs::write(output, out).unwrap();
            Ok(())
        }
    } // end of impl Node2VecRunner for FakeRunner

    #[test]
    fn test_fake_runner_and_cleanup() {
        log_init_test();
        //
        let graph = testgraph::with_isolated();
        let seen_dir = Arc::new(Mutex::new(None));
        let runner = FakeRunner {
            seen_dir: seen_dir.clone(),
            fail: false,
        };
        let mut embedder = Node2VecEmbedder::new(Node2VecParams::default(), Box::new(runner));
        let table = embedder.embed(&graph, 1).unwrap();
        assert_eq!(table.get_nb_nodes(), graph.nb_nodes() - 1);
        assert_eq!(table.get_dimension(), 3);
        // rank of COX1 in graph order is 2
        assert_eq!(table.get("COX1").unwrap().to_vec(), vec![2., 0.5, -1.]);
        let dir = seen_dir.lock().unwrap().clone().unwrap();
        assert!(!dir.exists());
    } // end of test_fake_runner_and_cleanup

    #[test]
    fn test_failure_cleans_up() {
        log_init_test();
        //
        let graph = testgraph::scenario_a();
        let seen_dir = Arc::new(Mutex::new(None));
        let runner = FakeRunner {
            seen_dir: seen_dir.clone(),
            fail: true,
        };
        let mut embedder = Node2VecEmbedder::new(Node2VecParams::default(), Box::new(runner));
        assert!(embedder.embed(&graph, 1).unwrap_err().is_training());
        let dir = seen_dir.lock().unwrap().clone().unwrap();
        assert!(!dir.exists());
    }

    #[test]
    fn test_missing_executable() {
        log_init_test();
        let _guard = process_lock();
        //
        let graph = testgraph::scenario_a();
        let mut params = Node2VecParams::default();
        params.set_executable(Path::new("/nonexistent/bin/node2vec"));
        let runner = CommandRunner::new(params.clone());
        let mut embedder = Node2VecEmbedder::new(params, Box::new(runner));
        assert!(embedder.embed(&graph, 1).unwrap_err().is_training());
    }

    #[test]
    fn test_args() {
        let params = Node2VecParams::default();
        let args = params.get_args(Path::new("in.txt"), Path::new("out.emb"), 7);
        assert_eq!(
            args,
            vec!["-i:in.txt", "-o:out.emb", "-e:7", "-l:50", "-d:100", "-r:5", "-p:0.3", "-dr", "-v"]
        );
    }

    #[cfg(unix)]
    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        {
            let mut file = std::fs::File::create(&path).unwrap();
            file.write_all(body.as_bytes()).unwrap();
            file.sync_all().unwrap();
        } // file closed before exec
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn test_command_runner_script() {
        log_init_test();
        let _guard = process_lock();
        //
        let bindir = tempfile::tempdir().unwrap();
        let script = write_script(
            bindir.path(),
            "fake_n2v.sh",
            "#!/bin/sh\nfor a in \"$@\"; do case \"$a\" in -o:*) out=\"${a#-o:}\";; esac; done\nprintf '2 2\\n0 0.5 1.5\\n1 -1 2\\n' > \"$out\"\n",
        );
        let mut params = Node2VecParams::default();
        params.set_executable(&script);
        let mut graph = KGraph::new();
        graph.add_node("a", "drug").unwrap();
        graph.add_node("b", "protein").unwrap();
        graph.add_edge("a", "b", "targets").unwrap();
        let mut embedder = Node2VecEmbedder::new(params.clone(), Box::new(CommandRunner::new(params)));
        let table = embedder.embed(&graph, 1).unwrap();
        assert_eq!(table.get("b").unwrap().to_vec(), vec![-1., 2.]);
    } // end of test_command_runner_script

    #[cfg(unix)]
    #[test]
    fn test_command_runner_timeout() {
        log_init_test();
        let _guard = process_lock();
        //
        let bindir = tempfile::tempdir().unwrap();
        let script = write_script(bindir.path(), "slow_n2v.sh", "#!/bin/sh\nsleep 30\n");
        let mut params = Node2VecParams::default();
        params.set_executable(&script);
        params.set_timeout_secs(1);
        let runner = CommandRunner::new(params);
        let start = SystemTime::now();
        let res = runner.run(Path::new("in"), Path::new("out"), 1);
        assert!(res.unwrap_err().is_training());
        assert!(start.elapsed().unwrap() < Duration::from_secs(20));
    } // end of test_command_runner_timeout
} // end of mod tests
