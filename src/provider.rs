use crate::ir::{DEFAULT_FONT, DEFAULT_TEXT_COLOR, Graph, Line, Vertex, VertexHandle};

const INSTRUCTIONS: [&str; 36] = [
    "LOADK", "FORPREP", "FORLOOP", "MOVE", "GETUPVAL", "SETUPVAL", "GETTABUP", "GETTABLE",
    "SETTABUP", "SETTABLE", "NEWTABLE", "SELF", "ADD", "SUB", "MUL", "DIV", "MOD", "POW", "UNM",
    "NOT", "LEN", "CONCAT", "JMP", "EQ", "LT", "LE", "TEST", "TESTSET", "CALL", "TAILCALL",
    "RETURN", "FORCALL", "TFORLOOP", "SETLIST", "CLOSURE", "VARARG",
];

const ADDRESS_COLOR: &str = "#3FAAB5";
const LOAD_COLOR: &str = "#AD9764";
const OPCODE_COLOR: &str = "#B686C1";
const OPERAND_COLOR: &str = "#3FAAB5";

/// Fills a freshly added vertex with its lines of styled text.
pub trait ContentProvider {
    fn provide(&mut self, vertex: &mut Vertex);
}

/// Leaves vertices without content.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyContentProvider;

impl ContentProvider for EmptyContentProvider {
    fn provide(&mut self, vertex: &mut Vertex) {
        vertex.lines.clear();
    }
}

/// Deterministic linear congruential generator for demo content.
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    const MODULUS: u64 = 233_280;

    pub fn new(seed: u64) -> Self {
        Self {
            state: seed % Self::MODULUS,
        }
    }

    /// Next value in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.state = (self.state * 9301 + 49_297) % Self::MODULUS;
        self.state as f64 / Self::MODULUS as f64
    }

    /// Next value in `0..bound`; `bound` of zero yields zero.
    pub fn below(&mut self, bound: usize) -> usize {
        if bound == 0 {
            return 0;
        }
        ((self.next_f64() * bound as f64) as usize).min(bound - 1)
    }
}

/// Produces disassembly-looking lines: address, opcode, two or three operands.
#[derive(Debug, Clone)]
pub struct DebugContentProvider {
    rng: SimpleRng,
    address: u32,
    max_lines: usize,
}

impl DebugContentProvider {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SimpleRng::new(seed),
            address: 0,
            max_lines: 10,
        }
    }

    pub fn with_max_lines(mut self, max_lines: usize) -> Self {
        self.max_lines = max_lines.max(1);
        self
    }
}

impl ContentProvider for DebugContentProvider {
    fn provide(&mut self, vertex: &mut Vertex) {
        vertex.lines.clear();
        let line_count = self.rng.below(self.max_lines) + 1;
        for _ in 0..line_count {
            let mut line = Line::new(DEFAULT_FONT, DEFAULT_TEXT_COLOR);
            self.address += 1;
            line.push(format!("{:04x}\t", self.address), Some(ADDRESS_COLOR));

            let word = INSTRUCTIONS[self.rng.below(INSTRUCTIONS.len())];
            let opcode_color = if word == "LOADK" || word == "FORPREP" {
                LOAD_COLOR
            } else {
                OPCODE_COLOR
            };
            line.push(format!("{word}\t"), Some(opcode_color));

            let operands = if self.rng.next_f64() > 0.5 { 3 } else { 2 };
            for _ in 0..operands {
                line.push(format!("{}\t", self.rng.below(100)), Some(OPERAND_COLOR));
            }
            vertex.lines.push(line);
        }
    }
}

/// Random branching chain: each vertex hangs off the current tip, which advances on a coin
/// flip or once it already has two successors.
pub fn random_graph(provider: Box<dyn ContentProvider>, rng: &mut SimpleRng) -> Graph {
    let mut graph = Graph::new(provider);
    let count = rng.below(10) + 1;
    let mut current = graph.root();
    for _ in 0..count {
        let vertex = graph.add_vertex();
        graph.add_edge(current, vertex);
        if rng.next_f64() > 0.5 || graph.out_degree(current) == 2 {
            current = vertex;
        }
    }
    graph
}

/// Eleven-vertex graph with nested branches and one join; used by the demo and tests.
pub fn sample_graph(provider: Box<dyn ContentProvider>) -> Graph {
    const EDGES: [(usize, usize); 11] = [
        (0, 1),
        (1, 2),
        (1, 3),
        (3, 4),
        (3, 5),
        (5, 6),
        (5, 7),
        (7, 8),
        (8, 9),
        (9, 10),
        (2, 10),
    ];
    let mut graph = Graph::new(provider);
    for _ in 1..11 {
        graph.add_vertex();
    }
    for (source, target) in EDGES {
        graph.add_edge(VertexHandle::new(source), VertexHandle::new(target));
    }
    graph
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rng_is_deterministic_and_bounded() {
        let mut a = SimpleRng::new(7);
        let mut b = SimpleRng::new(7);
        for _ in 0..100 {
            let value = a.next_f64();
            assert_eq!(value, b.next_f64());
            assert!((0.0..1.0).contains(&value));
        }
        let mut rng = SimpleRng::new(3);
        for _ in 0..100 {
            assert!(rng.below(4) < 4);
        }
        assert_eq!(rng.below(0), 0);
    }

    #[test]
    fn debug_provider_emits_addressed_lines() {
        let mut provider = DebugContentProvider::new(11);
        let mut vertex = Vertex::default();
        provider.provide(&mut vertex);
        assert!(!vertex.lines.is_empty() && vertex.lines.len() <= 10);
        let first = &vertex.lines[0];
        assert_eq!(first.runs[0].text, "0001\t");
        assert_eq!(first.runs[0].color, ADDRESS_COLOR);
        assert!(first.runs.len() == 4 || first.runs.len() == 5);
    }

    #[test]
    fn random_graph_caps_fan_out_at_two() {
        for seed in 0..20 {
            let mut rng = SimpleRng::new(seed);
            let graph = random_graph(Box::new(EmptyContentProvider), &mut rng);
            assert!(graph.vertex_count() >= 2);
            for handle in graph.handles() {
                assert!(graph.out_degree(handle) <= 2);
            }
        }
    }

    #[test]
    fn sample_graph_shape() {
        let graph = sample_graph(Box::new(EmptyContentProvider));
        assert_eq!(graph.vertex_count(), 11);
        assert_eq!(graph.edges().len(), 11);
        assert_eq!(graph.out_degree(VertexHandle::new(1)), 2);
    }
}
