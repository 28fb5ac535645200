//! Built-in benchmark routines.
//!
//! Each public routine takes the command's argument tokens, runs the kernel at
//! the requested size and discards the result through `black_box`. The pure
//! kernels are exposed separately so their outputs can be checked.

use std::hint::black_box;

use anyhow::{Context, bail};

fn size_arg(args: &[&str], workload: &str) -> anyhow::Result<usize> {
    let raw = args
        .first()
        .with_context(|| format!("{workload}: missing size argument"))?;
    raw.parse::<usize>()
        .with_context(|| format!("{workload}: invalid size argument {raw:?}"))
}

/// Size argument limited to `max`; larger sizes would overflow buffer sizing
/// or exhaust memory.
fn bounded_size_arg(args: &[&str], workload: &str, max: usize) -> anyhow::Result<usize> {
    let n = size_arg(args, workload)?;
    if n > max {
        bail!("{workload}: size must be at most {max}, got {n}");
    }
    Ok(n)
}

const MANDELBROT_MAX: usize = 16_000;
const NBODY_MAX: usize = 1_000_000_000;
const SPECTRAL_NORM_MAX: usize = 100_000;
const BINARY_TREES_MAX: usize = 24;
const FASTA_MAX: usize = 100_000_000;
const PIDIGITS_MAX: usize = 100_000;

pub fn empty(_args: &[&str]) -> anyhow::Result<()> {
    Ok(())
}

pub fn fannkuch(args: &[&str]) -> anyhow::Result<()> {
    let n = size_arg(args, "fannkuch")?;
    if !(1..=12).contains(&n) {
        bail!("fannkuch: size must be between 1 and 12, got {n}");
    }
    black_box(fannkuch_redux(n));
    Ok(())
}

pub fn mandelbrot(args: &[&str]) -> anyhow::Result<()> {
    let n = bounded_size_arg(args, "mandelbrot", MANDELBROT_MAX)?;
    black_box(mandelbrot_bitmap(n));
    Ok(())
}

pub fn himeno(args: &[&str]) -> anyhow::Result<()> {
    let grid = args.first().copied().unwrap_or("S");
    let dims = himeno_grid(grid)?;
    black_box(himeno_jacobi(dims, HIMENO_ITERATIONS));
    Ok(())
}

pub fn nbody(args: &[&str]) -> anyhow::Result<()> {
    let steps = bounded_size_arg(args, "nbody", NBODY_MAX)?;
    black_box(nbody_energy_after(steps));
    Ok(())
}

pub fn spectral_norm(args: &[&str]) -> anyhow::Result<()> {
    let n = bounded_size_arg(args, "spectralnorm", SPECTRAL_NORM_MAX)?;
    black_box(spectral_norm_of(n));
    Ok(())
}

pub fn binary_trees(args: &[&str]) -> anyhow::Result<()> {
    let depth = bounded_size_arg(args, "binarytrees", BINARY_TREES_MAX)?;
    black_box(binary_trees_checksum(depth));
    Ok(())
}

pub fn fasta(args: &[&str]) -> anyhow::Result<()> {
    let n = bounded_size_arg(args, "fasta", FASTA_MAX)?;
    black_box(fasta_checksum(n));
    Ok(())
}

pub fn pidigits(args: &[&str]) -> anyhow::Result<()> {
    let n = bounded_size_arg(args, "pidigits", PIDIGITS_MAX)?;
    black_box(pi_digits(n));
    Ok(())
}

/// Returns `(checksum, max_flips)`.
pub fn fannkuch_redux(n: usize) -> (i64, u32) {
    let mut perm: Vec<usize> = (0..n).collect();
    let mut count = vec![0usize; n];
    let mut scratch = vec![0usize; n];
    let mut checksum = 0i64;
    let mut max_flips = 0u32;
    let mut permutation_index = 0i64;
    let mut r = n;

    loop {
        while r > 1 {
            count[r - 1] = r;
            r -= 1;
        }

        scratch.copy_from_slice(&perm);
        let mut flips = 0u32;
        let mut first = scratch[0];
        while first != 0 {
            scratch[..=first].reverse();
            flips += 1;
            first = scratch[0];
        }
        max_flips = max_flips.max(flips);
        checksum += if permutation_index % 2 == 0 {
            flips as i64
        } else {
            -(flips as i64)
        };

        loop {
            if r == n {
                return (checksum, max_flips);
            }
            let head = perm[0];
            perm.copy_within(1..=r, 0);
            perm[r] = head;
            count[r] -= 1;
            if count[r] > 0 {
                break;
            }
            r += 1;
        }
        permutation_index += 1;
    }
}

/// Packed PBM-style bitmap of the Mandelbrot set on an `n`×`n` grid.
pub fn mandelbrot_bitmap(n: usize) -> Vec<u8> {
    const MAX_ITER: usize = 50;
    const LIMIT_SQ: f64 = 4.0;
    let row_bytes = n.div_ceil(8);
    let mut out = vec![0u8; row_bytes * n];
    let inv = 2.0 / n as f64;

    for y in 0..n {
        let ci = y as f64 * inv - 1.0;
        for x in 0..n {
            let cr = x as f64 * inv - 1.5;
            let (mut zr, mut zi) = (0.0f64, 0.0f64);
            let mut inside = true;
            for _ in 0..MAX_ITER {
                let tr = zr * zr - zi * zi + cr;
                zi = 2.0 * zr * zi + ci;
                zr = tr;
                if zr * zr + zi * zi > LIMIT_SQ {
                    inside = false;
                    break;
                }
            }
            if inside {
                out[y * row_bytes + x / 8] |= 0x80 >> (x % 8);
            }
        }
    }
    out
}

const HIMENO_ITERATIONS: usize = 64;

/// Array dimensions `(mimax, mjmax, mkmax)` for a Himeno grid size label.
pub fn himeno_grid(label: &str) -> anyhow::Result<(usize, usize, usize)> {
    Ok(match label {
        "XS" | "xs" => (33, 33, 65),
        "S" | "s" => (65, 65, 129),
        "M" | "m" => (129, 129, 257),
        "L" | "l" => (257, 257, 513),
        other => bail!("himeno: unknown grid size {other:?}"),
    })
}

/// Jacobi iteration of the Himeno Poisson solver. Returns the final residual `gosa`.
pub fn himeno_jacobi(dims: (usize, usize, usize), iterations: usize) -> f32 {
    let (mi, mj, mk) = dims;
    let idx = |i: usize, j: usize, k: usize| (i * mj + j) * mk + k;
    let cells = mi * mj * mk;

    let mut p = vec![0f32; cells];
    for i in 0..mi {
        let v = (i * i) as f32 / ((mi - 1) * (mi - 1)) as f32;
        for j in 0..mj {
            for k in 0..mk {
                p[idx(i, j, k)] = v;
            }
        }
    }
    let a = [1.0f32, 1.0, 1.0, 1.0 / 6.0];
    let b = [0.0f32; 3];
    let c = [1.0f32; 3];
    let bnd = 1.0f32;
    let wrk1 = 0.0f32;
    let omega = 0.8f32;
    let mut wrk2 = vec![0f32; cells];
    let mut gosa = 0.0f32;

    for _ in 0..iterations {
        gosa = 0.0;
        for i in 1..mi - 1 {
            for j in 1..mj - 1 {
                for k in 1..mk - 1 {
                    let s0 = a[0] * p[idx(i + 1, j, k)]
                        + a[1] * p[idx(i, j + 1, k)]
                        + a[2] * p[idx(i, j, k + 1)]
                        + b[0]
                            * (p[idx(i + 1, j + 1, k)] - p[idx(i + 1, j - 1, k)]
                                - p[idx(i - 1, j + 1, k)]
                                + p[idx(i - 1, j - 1, k)])
                        + b[1]
                            * (p[idx(i, j + 1, k + 1)] - p[idx(i, j - 1, k + 1)]
                                - p[idx(i, j + 1, k - 1)]
                                + p[idx(i, j - 1, k - 1)])
                        + b[2]
                            * (p[idx(i + 1, j, k + 1)] - p[idx(i - 1, j, k + 1)]
                                - p[idx(i + 1, j, k - 1)]
                                + p[idx(i - 1, j, k - 1)])
                        + c[0] * p[idx(i - 1, j, k)]
                        + c[1] * p[idx(i, j - 1, k)]
                        + c[2] * p[idx(i, j, k - 1)]
                        + wrk1;
                    let ss = (s0 * a[3] - p[idx(i, j, k)]) * bnd;
                    gosa += ss * ss;
                    wrk2[idx(i, j, k)] = p[idx(i, j, k)] + omega * ss;
                }
            }
        }
        for i in 1..mi - 1 {
            for j in 1..mj - 1 {
                let start = idx(i, j, 1);
                let end = idx(i, j, mk - 1);
                p[start..end].copy_from_slice(&wrk2[start..end]);
            }
        }
    }
    gosa
}

struct Body {
    pos: [f64; 3],
    vel: [f64; 3],
    mass: f64,
}

const SOLAR_MASS: f64 = 4.0 * std::f64::consts::PI * std::f64::consts::PI;
const DAYS_PER_YEAR: f64 = 365.24;

fn solar_system() -> Vec<Body> {
    let body = |pos: [f64; 3], vel: [f64; 3], mass: f64| Body {
        pos,
        vel: vel.map(|v| v * DAYS_PER_YEAR),
        mass: mass * SOLAR_MASS,
    };
    let mut bodies = vec![
        body([0.0; 3], [0.0; 3], 1.0),
        // jupiter
        body(
            [4.841_431_442_464_72, -1.160_320_044_027_428_4, -0.103_622_044_471_123_11],
            [1.660_076_642_744_037e-3, 7.699_011_184_197_404e-3, -6.904_600_169_720_63e-5],
            9.547_919_384_243_266e-4,
        ),
        // saturn
        body(
            [8.343_366_718_244_58, 4.124_798_564_124_305, -4.035_234_171_143_214e-1],
            [-2.767_425_107_268_624e-3, 4.998_528_012_349_172e-3, 2.304_172_975_737_639_3e-5],
            2.858_859_806_661_308e-4,
        ),
        // uranus
        body(
            [1.289_436_956_213_913_1e1, -1.511_115_140_169_863_1e1, -2.233_075_788_926_557_3e-1],
            [2.964_601_375_647_616e-3, 2.378_471_739_594_809_5e-3, -2.965_895_685_402_375_6e-5],
            4.366_244_043_351_563e-5,
        ),
        // neptune
        body(
            [1.537_969_711_485_091_1e1, -2.591_931_460_998_796_4e1, 1.792_587_729_503_711_8e-1],
            [2.680_677_724_903_893_2e-3, 1.628_241_700_382_423e-3, -9.515_922_545_197_159e-5],
            5.151_389_020_466_114_5e-5,
        ),
    ];

    let mut momentum = [0.0f64; 3];
    for b in &bodies {
        for d in 0..3 {
            momentum[d] += b.vel[d] * b.mass;
        }
    }
    for d in 0..3 {
        bodies[0].vel[d] = -momentum[d] / SOLAR_MASS;
    }
    bodies
}

fn energy(bodies: &[Body]) -> f64 {
    let mut e = 0.0;
    for (i, b) in bodies.iter().enumerate() {
        e += 0.5 * b.mass * b.vel.iter().map(|v| v * v).sum::<f64>();
        for other in &bodies[i + 1..] {
            let dist = (0..3)
                .map(|d| (b.pos[d] - other.pos[d]).powi(2))
                .sum::<f64>()
                .sqrt();
            e -= b.mass * other.mass / dist;
        }
    }
    e
}

fn advance(bodies: &mut [Body], dt: f64) {
    let n = bodies.len();
    for i in 0..n {
        let (left, right) = bodies.split_at_mut(i + 1);
        let bi = &mut left[i];
        for bj in right.iter_mut() {
            let delta = [
                bi.pos[0] - bj.pos[0],
                bi.pos[1] - bj.pos[1],
                bi.pos[2] - bj.pos[2],
            ];
            let dist_sq: f64 = delta.iter().map(|d| d * d).sum();
            let mag = dt / (dist_sq * dist_sq.sqrt());
            for d in 0..3 {
                bi.vel[d] -= delta[d] * bj.mass * mag;
                bj.vel[d] += delta[d] * bi.mass * mag;
            }
        }
    }
    for b in bodies.iter_mut() {
        for d in 0..3 {
            b.pos[d] += dt * b.vel[d];
        }
    }
}

/// Returns `(energy_before, energy_after)` for `steps` of the Jovian planets simulation.
pub fn nbody_energy_after(steps: usize) -> (f64, f64) {
    let mut bodies = solar_system();
    let before = energy(&bodies);
    for _ in 0..steps {
        advance(&mut bodies, 0.01);
    }
    (before, energy(&bodies))
}

fn spectral_a(i: usize, j: usize) -> f64 {
    1.0 / (((i + j) * (i + j + 1) / 2 + i + 1) as f64)
}

fn mul_av(v: &[f64], out: &mut [f64]) {
    for (i, o) in out.iter_mut().enumerate() {
        *o = v.iter().enumerate().map(|(j, x)| spectral_a(i, j) * x).sum();
    }
}

fn mul_atv(v: &[f64], out: &mut [f64]) {
    for (i, o) in out.iter_mut().enumerate() {
        *o = v.iter().enumerate().map(|(j, x)| spectral_a(j, i) * x).sum();
    }
}

fn mul_atav(v: &[f64], out: &mut [f64], tmp: &mut [f64]) {
    mul_av(v, tmp);
    mul_atv(tmp, out);
}

pub fn spectral_norm_of(n: usize) -> f64 {
    let mut u = vec![1.0f64; n];
    let mut v = vec![0.0f64; n];
    let mut tmp = vec![0.0f64; n];
    for _ in 0..10 {
        mul_atav(&u, &mut v, &mut tmp);
        mul_atav(&v, &mut u, &mut tmp);
    }
    let vbv: f64 = u.iter().zip(&v).map(|(a, b)| a * b).sum();
    let vv: f64 = v.iter().map(|x| x * x).sum();
    (vbv / vv).sqrt()
}

struct Tree {
    children: Option<(Box<Tree>, Box<Tree>)>,
}

fn bottom_up(depth: usize) -> Tree {
    Tree {
        children: (depth > 0).then(|| (Box::new(bottom_up(depth - 1)), Box::new(bottom_up(depth - 1)))),
    }
}

fn item_check(tree: &Tree) -> usize {
    match &tree.children {
        Some((l, r)) => 1 + item_check(l) + item_check(r),
        None => 1,
    }
}

/// Sum of node counts over the stretch, iterated and long-lived trees.
pub fn binary_trees_checksum(max_depth: usize) -> usize {
    const MIN_DEPTH: usize = 4;
    let max_depth = max_depth.max(MIN_DEPTH + 2);
    let mut total = item_check(&bottom_up(max_depth + 1));
    let long_lived = bottom_up(max_depth);

    let mut depth = MIN_DEPTH;
    while depth <= max_depth {
        let iterations = 1usize << (max_depth - depth + MIN_DEPTH);
        for _ in 0..iterations {
            total += item_check(&bottom_up(depth));
        }
        depth += 2;
    }
    total + item_check(&long_lived)
}

const ALU: &[u8] = b"GGCCGGGCGCGGTGGCTCACGCCTGTAATCCCAGCACTTTGG\
GAGGCCGAGGCGGGCGGATCACCTGAGGTCAGGAGTTCGAGACCAGCCTGGCCAACATGGTGAAACCCCGTCTCTACT\
AAAAATACAAAAATTAGCCGGGCGTGGTGGCGCGCGCCTGTAATCCCAGCTACTCGGGAGGCTGAGGCAGGAGAATCG\
CTTGAACCCGGGAGGCGGAGGTTGCAGTGAGCCGAGATCGCGCCACTGCACTCCAGCCTGGGCGACAGAGCGAGACTC\
CGTCTCAAAAA";

const IUB: &[(u8, f64)] = &[
    (b'a', 0.27),
    (b'c', 0.12),
    (b'g', 0.12),
    (b't', 0.27),
    (b'B', 0.02),
    (b'D', 0.02),
    (b'H', 0.02),
    (b'K', 0.02),
    (b'M', 0.02),
    (b'N', 0.02),
    (b'R', 0.02),
    (b'S', 0.02),
    (b'V', 0.02),
    (b'W', 0.02),
    (b'Y', 0.02),
];

const HOMO_SAPIENS: &[(u8, f64)] = &[
    (b'a', 0.302_954_942_668_7),
    (b'c', 0.197_988_708_406_7),
    (b'g', 0.197_547_389_287_1),
    (b't', 0.301_508_959_637_5),
];

const LINE_WIDTH: usize = 60;

struct Lcg(u32);

impl Lcg {
    const IM: u32 = 139_968;
    const IA: u32 = 3_877;
    const IC: u32 = 29_573;

    fn next(&mut self) -> f64 {
        self.0 = (self.0 * Self::IA + Self::IC) % Self::IM;
        self.0 as f64 / Self::IM as f64
    }
}

fn fold_line(acc: u64, line: &[u8]) -> u64 {
    line.iter()
        .fold(acc, |h, b| h.wrapping_mul(31).wrapping_add(*b as u64))
        .wrapping_mul(31)
        .wrapping_add(b'\n' as u64)
}

fn repeat_fasta(acc: u64, n: usize) -> u64 {
    let mut acc = acc;
    let mut pos = 0;
    let mut line = Vec::with_capacity(LINE_WIDTH);
    let mut remaining = n;
    while remaining > 0 {
        let width = remaining.min(LINE_WIDTH);
        line.clear();
        for _ in 0..width {
            line.push(ALU[pos]);
            pos = (pos + 1) % ALU.len();
        }
        acc = fold_line(acc, &line);
        remaining -= width;
    }
    acc
}

fn random_fasta(acc: u64, table: &[(u8, f64)], n: usize, rng: &mut Lcg) -> u64 {
    let mut cumulative = Vec::with_capacity(table.len());
    let mut sum = 0.0;
    for (c, p) in table {
        sum += p;
        cumulative.push((*c, sum));
    }
    let pick = |r: f64| {
        cumulative
            .iter()
            .find(|(_, p)| r < *p)
            .map(|(c, _)| *c)
            .unwrap_or(cumulative[cumulative.len() - 1].0)
    };

    let mut acc = acc;
    let mut line = Vec::with_capacity(LINE_WIDTH);
    let mut remaining = n;
    while remaining > 0 {
        let width = remaining.min(LINE_WIDTH);
        line.clear();
        for _ in 0..width {
            line.push(pick(rng.next()));
        }
        acc = fold_line(acc, &line);
        remaining -= width;
    }
    acc
}

/// Rolling hash over the three FASTA sections generated for size `n`.
pub fn fasta_checksum(n: usize) -> u64 {
    let mut rng = Lcg(42);
    let mut acc = fold_line(0, b">ONE Homo sapiens alu");
    acc = repeat_fasta(acc, n * 2);
    acc = fold_line(acc, b">TWO IUB ambiguity codes");
    acc = random_fasta(acc, IUB, n * 3, &mut rng);
    acc = fold_line(acc, b">THREE Homo sapiens frequency");
    random_fasta(acc, HOMO_SAPIENS, n * 5, &mut rng)
}

/// First `n` decimal digits of pi using the Rabinowitz–Wagon spigot.
pub fn pi_digits(n: usize) -> Vec<u8> {
    if n == 0 {
        return Vec::new();
    }
    let len = n * 10 / 3 + 1;
    let mut a = vec![2u64; len];
    let mut digits = Vec::with_capacity(n);
    let mut nines = 0usize;
    let mut predigit = 0u64;

    for j in 1..=n {
        let mut q = 0u64;
        for i in (1..=len).rev() {
            let x = 10 * a[i - 1] + q * i as u64;
            let denom = 2 * i as u64 - 1;
            a[i - 1] = x % denom;
            q = x / denom;
        }
        a[0] = q % 10;
        q /= 10;
        match q {
            9 => nines += 1,
            10 => {
                digits.push((predigit + 1) as u8);
                digits.extend(std::iter::repeat_n(0u8, nines));
                predigit = 0;
                nines = 0;
            }
            _ => {
                if j > 1 {
                    digits.push(predigit as u8);
                }
                predigit = q;
                digits.extend(std::iter::repeat_n(9u8, nines));
                nines = 0;
            }
        }
    }
    digits.push(predigit as u8);
    digits.extend(std::iter::repeat_n(9u8, nines));
    digits.truncate(n);
    digits
}
