//! Writes `sample_raptor.csv`: synthetic player seasons laid out like the
//! published spreadsheet (title row, header row, index column).

const OUTPUT: &str = "sample_raptor.csv";

const PLAYERS: [(&str, &str, u32); 8] = [
    ("Kyle Lowry", "PG", 2007),
    ("DeMar DeRozan", "SG", 2010),
    ("Kawhi Leonard", "SF", 2012),
    ("Pascal Siakam", "PF", 2017),
    ("Jonas Valanciunas", "C", 2013),
    ("Fred VanVleet", "PG", 2017),
    ("OG Anunoby", "SF", 2018),
    ("Serge Ibaka", "C", 2010),
];

const TEAMS: [&str; 4] = ["TOR", "SAS", "LAC", "MEM"];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }
}

fn main() {
    let mut rng = SimpleRng::new(42);
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(OUTPUT)
        .expect("Failed to create output file");

    writer
        .write_record(["Raptor ratings by player season (synthetic)"])
        .expect("Failed to write title row");
    writer
        .write_record([
            "", "Player", "Year", "Age", "Tm", "Type", "G", "MP", "eRO", "eRD", "eRT", "eWAR",
            "Pos", "Updated",
        ])
        .expect("Failed to write header row");

    let mut row_id = 0usize;
    for (player, pos, rookie_year) in PLAYERS {
        // Per-player skill offsets so the comparison lines differ.
        let offense = rng.gauss(1.0, 1.5);
        let defense = rng.gauss(0.0, 1.2);
        let seasons = 5 + rng.below(6);
        let first_age = 20 + rng.below(4) as u32;

        for season in 0..seasons as u32 {
            let year = rookie_year + season;
            let age = first_age + season;
            // Players peak around 27.
            let aging = -0.08 * (age as f64 - 27.0).powi(2) + 1.0;
            let team = TEAMS[rng.below(TEAMS.len())];

            for record_type in ["RS", "PO"] {
                if record_type == "PO" && rng.next_f64() < 0.3 {
                    continue;
                }
                let games = if record_type == "RS" {
                    55 + rng.below(28)
                } else {
                    4 + rng.below(20)
                };
                let minutes = games as f64 * rng.gauss(30.0, 3.0);
                let ero = offense + aging + rng.gauss(0.0, 1.0);
                let erd = defense + 0.5 * aging + rng.gauss(0.0, 0.8);
                let ert = ero + erd;
                let ewar = ert * minutes / 2500.0 + 1.0;

                writer
                    .write_record([
                        row_id.to_string(),
                        player.to_string(),
                        year.to_string(),
                        age.to_string(),
                        team.to_string(),
                        record_type.to_string(),
                        games.to_string(),
                        format!("{minutes:.0}"),
                        format!("{ero:.2}"),
                        format!("{erd:.2}"),
                        format!("{ert:.2}"),
                        format!("{ewar:.2}"),
                        pos.to_string(),
                        format!("{}-06-{:02}", year + 1, 1 + rng.below(28)),
                    ])
                    .expect("Failed to write row");
                row_id += 1;
            }
        }
    }

    writer.flush().expect("Failed to flush output");
    println!("Wrote {row_id} player seasons to {OUTPUT}");
}
