//! Precomputed attack tables: knight/king/pawn lookups, and magic-bitboard
//! sliding-piece attacks for bishops and rooks. Everything here is built
//! once, lazily, at first use and is read-only afterwards — the "singleton
//! context" the rest of the engine treats as ambient, immutable state.

use crate::bitboard::Bitboard;
use crate::types::{Color, Square};
use once_cell::sync::Lazy;

/// Per-square count of relevant occupancy bits for rook magics.
const ROOK_BITS: [u8; 64] = [
    12, 11, 11, 11, 11, 11, 11, 12, 11, 10, 10, 10, 10, 10, 10, 11, 11, 10, 10, 10, 10, 10, 10,
    11, 11, 10, 10, 10, 10, 10, 10, 11, 11, 10, 10, 10, 10, 10, 10, 11, 11, 10, 10, 10, 10, 10,
    10, 11, 10, 9, 9, 9, 9, 9, 9, 10, 11, 10, 10, 10, 10, 11, 10, 11,
];

/// Per-square count of relevant occupancy bits for bishop magics.
const BISHOP_BITS: [u8; 64] = [
    5, 4, 5, 5, 5, 5, 4, 5, 4, 4, 5, 5, 5, 5, 4, 4, 4, 4, 7, 7, 7, 7, 4, 4, 5, 5, 7, 9, 9, 7, 5,
    5, 5, 5, 7, 9, 9, 7, 5, 5, 4, 4, 7, 7, 7, 7, 4, 4, 4, 4, 5, 5, 5, 5, 4, 4, 5, 4, 5, 5, 5, 5,
    4, 5,
];

/// Known-good magic multipliers for rooks, one per square, each of which
/// perfectly hashes that square's relevant occupancy subsets into a table
/// of size `1 << ROOK_BITS[sq]` with no collisions.
const ROOK_MAGICS: [u64; 64] = [
    0x4080_0020_4000_1480,
    0x0040_0010_0140_2000,
    0x0300_2000_1810_4100,
    0x2100_0409_0110_0120,
    0x8a00_0600_0408_2070,
    0x0080_0144_0002_0080,
    0x1100_2500_208a_0004,
    0x0900_0042_2201_8100,
    0x0208_8002_28c0_0081,
    0x2280_4010_0340_2000,
    0x0008_8010_0020_0184,
    0x0001_0020_1000_0900,
    0x0182_0006_0010_6008,
    0x2058_8004_0080_0200,
    0x0004_8002_0080_0900,
    0x052d_0012_0040_a100,
    0x0540_0880_0080_24c1,
    0x2000_8480_4002_2000,
    0x0400_4100_1100_6000,
    0x0040_a100_3001_0108,
    0x1204_8080_0800_0402,
    0x0802_8080_0400_2201,
    0x1002_8080_5200_0500,
    0x0004_0a00_2112_4184,
    0x0640_0128_8008_8040,
    0x8410_4000_8020_008a,
    0x0400_2008_8010_0080,
    0x2001_0121_0009_1004,
    0x1200_0d01_0008_0010,
    0x6004_0004_0120_1008,
    0x7500_aa04_0008_4110,
    0x0100_0052_0004_0981,
    0x0040_8040_0280_0020,
    0x0470_0020_0640_0240,
    0x0001_2000_8080_1000,
    0x0000_0812_0200_2040,
    0x00c0_8044_0080_0800,
    0x9000_800a_0080_0400,
    0x0001_0004_0100_0600,
    0x0042_1088_ca00_2401,
    0x0000_c000_228d_8000,
    0x6410_0420_1440_4001,
    0x1002_0040_8226_0014,
    0x206a_0088_11c2_0021,
    0x0002_0018_1022_0024,
    0x2001_0200_0400_8080,
    0x1000_0801_100c_001a,
    0x0048_0082_5402_0011,
    0x48ff_fe99_fecf_aa00,
    0x48ff_fe99_fecf_aa00,
    0x497f_ffad_ff9c_2e00,
    0x613f_ffdd_ffce_9200,
    0xffff_ffe9_ffe7_ce00,
    0xffff_fff5_fff3_e600,
    0x0003_ff95_e5e6_a4c0,
    0x510f_fff5_f63c_96a0,
    0xebff_ffb9_ff9f_c526,
    0x61ff_fedd_feed_aeae,
    0x53bf_ffed_ffde_b1a2,
    0x127f_ffb9_ffdf_b5f6,
    0x411f_ffdd_ffdb_f4d6,
    0x0822_0024_0810_4502,
    0x0003_ffef_27ee_be74,
    0x7645_fffe_cbfe_a79e,
];

/// Known-good magic multipliers for bishops, same scheme as `ROOK_MAGICS`.
const BISHOP_MAGICS: [u64; 64] = [
    0xffed_f9fd_7cfc_ffff,
    0xfc09_6285_4a77_f576,
    0x0012_2808_c102_a004,
    0x2851_2400_8240_0440,
    0x0011_1040_1100_0202,
    0x0008_2208_2000_0010,
    0xfc0a_66c6_4a7e_f576,
    0x7ffd_fdfc_bd79_ffff,
    0xfc08_46a6_4a34_fff6,
    0xfc08_7a87_4a3c_f7f6,
    0x0009_8802_0420_a000,
    0x8000_4404_0080_8200,
    0x208c_8450_c001_3407,
    0x1980_1105_2010_8030,
    0xfc08_64ae_59b4_ff76,
    0x3c08_60af_4b35_ff76,
    0x73c0_1af5_6cf4_cffb,
    0x41a0_1cfa_d64a_affc,
    0x0604_0002_04a2_0202,
    0x0002_8208_0602_4000,
    0x008a_0024_2201_0201,
    0x2082_0040_8801_0802,
    0x7c0c_028f_5b34_ff76,
    0xfc0a_028e_5ab4_df76,
    0x0810_0420_d104_1080,
    0x0904_5100_0210_0100,
    0x0202_2808_0406_4403,
    0x004c_0040_0c03_0082,
    0x0602_0010_0200_5011,
    0x7209_0200_c108_9000,
    0x4211_4104_2400_8805,
    0x0002_8484_2126_0804,
    0xc001_0412_1121_2004,
    0x0208_0188_0004_4800,
    0x0080_2064_1058_0800,
    0x0000_2011_0008_0084,
    0x0208_0034_0009_4100,
    0x2190_4102_0000_4058,
    0x0188_8214_0180_8080,
    0x2006_0a02_0000_c4c0,
    0xdcef_d9b5_4bfc_c09f,
    0xf95f_fa76_5afd_602b,
    0x200a_1041_1000_2040,
    0x0800_000c_0831_0c00,
    0x0218_0401_0a01_0400,
    0x1092_2004_0022_4100,
    0x43ff_9a5c_f4ca_0c01,
    0x4bff_cd8e_7c58_7601,
    0xfc0f_f286_5334_f576,
    0xfc0b_f6ce_5924_f576,
    0x8052_2060_8c30_0001,
    0x2084_1050_4202_0400,
    0xe018_8010_2206_0220,
    0x0001_1220_4901_0200,
    0xc3ff_b7dc_36ca_8c89,
    0xc3ff_8a54_f4ca_2c89,
    0xffff_fcfc_fd79_edff,
    0xfc08_63fc_cb14_7576,
    0x40a0_0400_6213_3000,
    0x0142_0280_0084_0400,
    0x0009_0900_1006_1200,
    0x0800_8445_2810_0308,
    0xfc08_7e8e_4bb2_f736,
    0x43ff_9e4e_f4ca_2c89,
];

const ROOK_DIRS: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const BISHOP_DIRS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

/// Squares strictly between two squares on a ray, exclusive of both ends,
/// and the squares reachable by casting a ray out to the edge of the board.
fn ray_attacks_to_edge(sq: Square, dr: i8, df: i8, occupancy: Bitboard) -> Bitboard {
    let mut bb = Bitboard::EMPTY;
    let mut rank = sq.rank() as i8;
    let mut file = sq.file() as i8;
    loop {
        rank += dr;
        file += df;
        if !(0..8).contains(&rank) || !(0..8).contains(&file) {
            break;
        }
        let target = Square::new(rank as u8, file as u8);
        bb.set(target);
        if occupancy.test(target) {
            break;
        }
    }
    bb
}

fn slider_mask(sq: Square, dirs: &[(i8, i8); 4]) -> Bitboard {
    // The relevant-occupancy mask excludes the board edge in each direction,
    // since a blocker there cannot hide anything further.
    let mut bb = Bitboard::EMPTY;
    for &(dr, df) in dirs {
        let mut rank = sq.rank() as i8;
        let mut file = sq.file() as i8;
        loop {
            rank += dr;
            file += df;
            let next_rank = rank + dr;
            let next_file = file + df;
            if !(0..8).contains(&rank) || !(0..8).contains(&file) {
                break;
            }
            if !(0..8).contains(&next_rank) || !(0..8).contains(&next_file) {
                break;
            }
            bb.set(Square::new(rank as u8, file as u8));
        }
    }
    bb
}

fn slider_attacks_slow(sq: Square, occupancy: Bitboard, dirs: &[(i8, i8); 4]) -> Bitboard {
    let mut bb = Bitboard::EMPTY;
    for &(dr, df) in dirs {
        bb |= ray_attacks_to_edge(sq, dr, df, occupancy);
    }
    bb
}

/// Enumerates the `2^popcount(mask)` occupancy subsets of `mask`, the i-th
/// subset selected by the bits of `index`.
fn occupancy_subset(index: usize, mask: Bitboard) -> Bitboard {
    let mut result = Bitboard::EMPTY;
    let mut bits = mask;
    let mut i = 0;
    while bits.any() {
        let sq = bits.pop_first();
        if (index >> i) & 1 != 0 {
            result.set(sq);
        }
        i += 1;
    }
    result
}

struct SliderTable {
    masks: [Bitboard; 64],
    magics: [u64; 64],
    shifts: [u32; 64],
    offsets: [usize; 64],
    table: Vec<Bitboard>,
}

impl SliderTable {
    fn build(bits: &[u8; 64], magics: &[u64; 64], dirs: &[(i8, i8); 4]) -> Self {
        let mut masks = [Bitboard::EMPTY; 64];
        let mut shifts = [0u32; 64];
        let mut offsets = [0usize; 64];
        let mut total = 0usize;
        for sq_idx in 0..64 {
            let sq = Square::from_index(sq_idx as u8);
            masks[sq_idx] = slider_mask(sq, dirs);
            shifts[sq_idx] = 64 - bits[sq_idx] as u32;
            offsets[sq_idx] = total;
            total += 1 << bits[sq_idx];
        }
        let mut table = vec![Bitboard::EMPTY; total];
        for sq_idx in 0..64 {
            let sq = Square::from_index(sq_idx as u8);
            let mask = masks[sq_idx];
            let n = 1usize << mask.popcount();
            for i in 0..n {
                let occ = occupancy_subset(i, mask);
                let attacks = slider_attacks_slow(sq, occ, dirs);
                let key = ((occ.0.wrapping_mul(magics[sq_idx])) >> shifts[sq_idx]) as usize;
                table[offsets[sq_idx] + key] = attacks;
            }
        }
        SliderTable { masks, magics: *magics, shifts, offsets, table }
    }

    #[inline]
    fn attacks(&self, sq: Square, occupancy: Bitboard) -> Bitboard {
        let relevant = occupancy & self.masks[sq.index()];
        let key = ((relevant.0.wrapping_mul(self.magics[sq.index()])) >> self.shifts[sq.index()])
            as usize;
        self.table[self.offsets[sq.index()] + key]
    }
}

static ROOK_TABLE: Lazy<SliderTable> =
    Lazy::new(|| SliderTable::build(&ROOK_BITS, &ROOK_MAGICS, &ROOK_DIRS));
static BISHOP_TABLE: Lazy<SliderTable> =
    Lazy::new(|| SliderTable::build(&BISHOP_BITS, &BISHOP_MAGICS, &BISHOP_DIRS));

static KNIGHT_ATTACKS: Lazy<[Bitboard; 64]> = Lazy::new(|| {
    let mut table = [Bitboard::EMPTY; 64];
    const DELTAS: [(i8, i8); 8] =
        [(1, 2), (2, 1), (2, -1), (1, -2), (-1, -2), (-2, -1), (-2, 1), (-1, 2)];
    for idx in 0..64 {
        let sq = Square::from_index(idx as u8);
        let mut bb = Bitboard::EMPTY;
        for &(dr, df) in &DELTAS {
            let rank = sq.rank() as i8 + dr;
            let file = sq.file() as i8 + df;
            if (0..8).contains(&rank) && (0..8).contains(&file) {
                bb.set(Square::new(rank as u8, file as u8));
            }
        }
        table[idx] = bb;
    }
    table
});

static KING_ATTACKS: Lazy<[Bitboard; 64]> = Lazy::new(|| {
    let mut table = [Bitboard::EMPTY; 64];
    for idx in 0..64 {
        let sq = Square::from_index(idx as u8);
        let bb = Bitboard::from_square(sq);
        let mut result = Bitboard::EMPTY;
        result |= bb.north_one();
        result |= bb.south_one();
        result |= bb.east_one();
        result |= bb.west_one();
        result |= bb.north_east_one();
        result |= bb.north_west_one();
        result |= bb.south_east_one();
        result |= bb.south_west_one();
        table[idx] = result;
    }
    table
});

static PAWN_ATTACKS: Lazy<[[Bitboard; 64]; 2]> = Lazy::new(|| {
    let mut table = [[Bitboard::EMPTY; 64]; 2];
    for idx in 0..64 {
        let sq = Square::from_index(idx as u8);
        let bb = Bitboard::from_square(sq);
        table[Color::White.index()][idx] = bb.north_east_one() | bb.north_west_one();
        table[Color::Black.index()][idx] = bb.south_east_one() | bb.south_west_one();
    }
    table
});

/// Squares strictly between two squares sharing a rank, file, or diagonal;
/// empty if the squares are not aligned.
static BETWEEN: Lazy<Vec<Vec<Bitboard>>> = Lazy::new(|| {
    let mut table = vec![vec![Bitboard::EMPTY; 64]; 64];
    let dirs: Vec<(i8, i8)> = ROOK_DIRS.iter().chain(BISHOP_DIRS.iter()).copied().collect();
    for a in 0..64 {
        let sa = Square::from_index(a as u8);
        for &(dr, df) in &dirs {
            let mut bb = Bitboard::EMPTY;
            let mut rank = sa.rank() as i8;
            let mut file = sa.file() as i8;
            loop {
                rank += dr;
                file += df;
                if !(0..8).contains(&rank) || !(0..8).contains(&file) {
                    break;
                }
                let sb = Square::new(rank as u8, file as u8);
                table[a][sb.index()] = bb;
                bb.set(sb);
            }
        }
    }
    table
});

/// The full ray through two aligned squares, including both endpoints and
/// extending to both edges of the board; empty if not aligned.
static LINE: Lazy<Vec<Vec<Bitboard>>> = Lazy::new(|| {
    let mut table = vec![vec![Bitboard::EMPTY; 64]; 64];
    let dirs: Vec<(i8, i8)> = ROOK_DIRS.iter().chain(BISHOP_DIRS.iter()).copied().collect();
    for a in 0..64 {
        let sa = Square::from_index(a as u8);
        for &(dr, df) in &dirs {
            let full = ray_attacks_to_edge(sa, dr, df, Bitboard::EMPTY)
                | ray_attacks_to_edge(sa, -dr, -df, Bitboard::EMPTY)
                | Bitboard::from_square(sa);
            let mut rank = sa.rank() as i8;
            let mut file = sa.file() as i8;
            loop {
                rank += dr;
                file += df;
                if !(0..8).contains(&rank) || !(0..8).contains(&file) {
                    break;
                }
                let sb = Square::new(rank as u8, file as u8);
                table[a][sb.index()] = full;
            }
        }
    }
    table
});

#[inline]
pub fn knight_attacks(sq: Square) -> Bitboard {
    KNIGHT_ATTACKS[sq.index()]
}

#[inline]
pub fn king_attacks(sq: Square) -> Bitboard {
    KING_ATTACKS[sq.index()]
}

#[inline]
pub fn pawn_attacks(color: Color, sq: Square) -> Bitboard {
    PAWN_ATTACKS[color.index()][sq.index()]
}

#[inline]
pub fn bishop_attacks(sq: Square, occupancy: Bitboard) -> Bitboard {
    BISHOP_TABLE.attacks(sq, occupancy)
}

#[inline]
pub fn rook_attacks(sq: Square, occupancy: Bitboard) -> Bitboard {
    ROOK_TABLE.attacks(sq, occupancy)
}

#[inline]
pub fn queen_attacks(sq: Square, occupancy: Bitboard) -> Bitboard {
    bishop_attacks(sq, occupancy) | rook_attacks(sq, occupancy)
}

#[inline]
pub fn between(a: Square, b: Square) -> Bitboard {
    BETWEEN[a.index()][b.index()]
}

#[inline]
pub fn line_through(a: Square, b: Square) -> Bitboard {
    LINE[a.index()][b.index()]
}

/// Ensures every precomputed table is initialised; called once at startup so
/// initialisation failures surface before the first search rather than on
/// the first lookup.
pub fn init() {
    Lazy::force(&ROOK_TABLE);
    Lazy::force(&BISHOP_TABLE);
    Lazy::force(&KNIGHT_ATTACKS);
    Lazy::force(&KING_ATTACKS);
    Lazy::force(&PAWN_ATTACKS);
    Lazy::force(&BETWEEN);
    Lazy::force(&LINE);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_slider_attacks(sq: Square, occupancy: Bitboard, dirs: &[(i8, i8); 4]) -> Bitboard {
        slider_attacks_slow(sq, occupancy, dirs)
    }

    #[test]
    fn rook_magic_matches_ray_enumeration_on_sampled_occupancies() {
        for sq_idx in [0usize, 7, 27, 35, 63] {
            let sq = Square::from_index(sq_idx as u8);
            for seed in 0u64..64 {
                let occ = Bitboard(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15));
                let expected = reference_slider_attacks(sq, occ, &ROOK_DIRS);
                assert_eq!(rook_attacks(sq, occ), expected);
            }
        }
    }

    #[test]
    fn bishop_magic_matches_ray_enumeration_on_sampled_occupancies() {
        for sq_idx in [0usize, 9, 27, 36, 63] {
            let sq = Square::from_index(sq_idx as u8);
            for seed in 0u64..64 {
                let occ = Bitboard(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15));
                let expected = reference_slider_attacks(sq, occ, &BISHOP_DIRS);
                assert_eq!(bishop_attacks(sq, occ), expected);
            }
        }
    }

    #[test]
    fn knight_attacks_from_corner_has_two_targets() {
        assert_eq!(knight_attacks(Square::new(0, 0)).popcount(), 2);
    }

    #[test]
    fn between_is_empty_for_unaligned_squares() {
        assert!(between(Square::new(0, 0), Square::new(3, 7)).is_empty());
    }

    #[test]
    fn between_excludes_endpoints() {
        let a = Square::new(0, 0);
        let b = Square::new(0, 3);
        let bb = between(a, b);
        assert!(!bb.test(a));
        assert!(!bb.test(b));
        assert!(bb.test(Square::new(0, 1)));
        assert!(bb.test(Square::new(0, 2)));
    }
}
