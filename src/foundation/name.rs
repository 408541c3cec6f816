//! Canonical phonemic point names.
//!
//! Galaxies render as a single suffix syllable (`~zod`), stars as a
//! prefix+suffix pair (`~marzod`), planets as two pairs joined by `-`, moons
//! as four. Planet-sized values are passed through a keyed Feistel
//! permutation first so that numerically adjacent planets do not read as
//! siblings; the permutation cycle-walks to stay inside the planet range and
//! is exactly inverted when parsing.

use crate::foundation::error::{Result, TillerError};
use std::collections::HashMap;
use std::sync::OnceLock;

const PREFIXES: &str = "dozmarbinwansamlitsighidfidlissogdirwacsabwissib\
rigsoldopmodfoglidhopdardorlorhodfolrintogsilmir\
holpaslacrovlivdalsatlibtabhanticpidtorbolfosdot\
losdilforpilramtirwintadbicdifrocwidbisdasmidlop\
rilnardapmolsanlocnovsitnidtipsicropwitnatpanmin\
ritpodmottamtolsavposnapnopsomfinfonbanmorworsip\
ronnorbotwicsocwatdolmagpicdavbidbaltimtasmallig\
sivtagpadsaldivdactansidfabtarmonranniswolmispal\
lasdismaprabtobrollatlonnodnavfignomnibpagsopral\
bilhaddocridmocpacravripfaltodtiltinhapmicfanpat\
taclabmogsimsonpinlomrictapfirhasbosbatpochactid\
havsaplindibhosdabbitbarracparloddosbortochilmac\
tomdigfilfasmithobharmighinradmashalraglagfadtop\
mophabnilnosmilfopfamdatnoldinhatnacrisfotribhoc\
nimlarfitwalrapsarnalmoslandondanladdovrivbacpol\
laptalpitnambonrostonfodponsovnocsorlavmatmipfip";

const SUFFIXES: &str = "zodnecbudwessevpersutletfulpensytdurwepserwylsun\
rypsyxdyrnuphebpeglupdepdysputlughecryttyvsydnex\
lunmeplutseppesdelsulpedtemledtulmetwenbynhexfeb\
pyldulhetmevruttylwydtepbesdexsefwycburderneppur\
rysrebdennutsubpetrulsynregtydsupsemwynrecmegnet\
secmulnymtevwebsummutnyxrextebfushepbenmuswyxsym\
selrucdecwexsyrwetdylmynmesdetbetbeltuxtugmyrpel\
syptermebsetdutdegtexsurfeltudnuxruxrenwytnubmed\
lytdusnebrumtynseglyxpunresredfunrevrefmectedrus\
bexlebduxrynnumpyxrygryxfeptyrtustyclegnemfermer\
tenlusnussyltecmexpubrymtucfyllepdebbermughuttun\
bylsudpemdevlurdefbusbeprunmelpexdytbyttyplevmyl\
wedducfurfexnulluclennerlexrupnedlecrydlydfenwel\
nydhusrelrudneshesfetdesretdunlernyrsebhulryllud\
remlysfynwerrycsugnysnyllyndyndemluxfedsedbecmun\
lyrtesmudnytbyrsenwegfyrmurtelreptegpecnelnevfes";

const PLANET_MIN: u32 = 0x1_0000;

// Round keys for the planet scramble.
const RAKU: [u32; 4] = [0xb76d_5eed, 0xee28_1300, 0x85bc_ae01, 0x4b38_7af7];

fn prefix(idx: u8) -> &'static str {
    let i = idx as usize * 3;
    &PREFIXES[i..i + 3]
}

fn suffix(idx: u8) -> &'static str {
    let i = idx as usize * 3;
    &SUFFIXES[i..i + 3]
}

fn index_of(cell: &OnceLock<HashMap<&'static str, u8>>, table: &'static str, syl: &str) -> Option<u8> {
    let map = cell.get_or_init(|| {
        let mut map = HashMap::with_capacity(256);
        for i in 0..256usize {
            map.insert(&table[i * 3..i * 3 + 3], i as u8);
        }
        map
    });
    map.get(syl).copied()
}

fn prefix_index(syl: &str) -> Option<u8> {
    static INDEX: OnceLock<HashMap<&'static str, u8>> = OnceLock::new();
    index_of(&INDEX, PREFIXES, syl)
}

fn suffix_index(syl: &str) -> Option<u8> {
    static INDEX: OnceLock<HashMap<&'static str, u8>> = OnceLock::new();
    index_of(&INDEX, SUFFIXES, syl)
}

/// murmur3 (32-bit) over the two little-endian bytes of `key`.
fn muk(seed: u32, key: u16) -> u32 {
    const C1: u32 = 0xcc9e_2d51;
    const C2: u32 = 0x1b87_3593;

    let data = [(key & 0xff) as u8, (key >> 8) as u8];
    let mut h = seed;
    let mut k = (data[0] as u32) | ((data[1] as u32) << 8);
    k = k.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2);
    h ^= k;
    h ^= data.len() as u32;
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

/// One pass of the 4-round Feistel permutation over all of `u32`.
fn fe(m: u32) -> u32 {
    let mut l = m >> 16;
    let mut r = m & 0xffff;
    for key in RAKU {
        let next = l ^ (muk(key, r as u16) & 0xffff);
        l = r;
        r = next;
    }
    (l << 16) | r
}

/// Exact inverse of [`fe`].
fn fen(m: u32) -> u32 {
    let mut l = m >> 16;
    let mut r = m & 0xffff;
    for key in RAKU.iter().rev() {
        let prev = r ^ (muk(*key, l as u16) & 0xffff);
        r = l;
        l = prev;
    }
    (l << 16) | r
}

/// Scrambles a planet-range value, cycle-walking until the output lands back
/// in the planet range.
fn scramble(value: u32) -> u32 {
    debug_assert!(value >= PLANET_MIN);
    let mut out = fe(value);
    while out < PLANET_MIN {
        out = fe(out);
    }
    out
}

fn unscramble(value: u32) -> u32 {
    debug_assert!(value >= PLANET_MIN);
    let mut out = fen(value);
    while out < PLANET_MIN {
        out = fen(out);
    }
    out
}

/// Applies the planet scramble to the low 32 bits when they fall in the
/// planet range; galaxies, stars and moon high bits pass through.
fn obfuscate(value: u64) -> u64 {
    let low = (value & 0xffff_ffff) as u32;
    if low >= PLANET_MIN {
        (value & !0xffff_ffff) | scramble(low) as u64
    } else {
        value
    }
}

fn deobfuscate(value: u64) -> u64 {
    let low = (value & 0xffff_ffff) as u32;
    if low >= PLANET_MIN {
        (value & !0xffff_ffff) | unscramble(low) as u64
    } else {
        value
    }
}

/// Canonical name of a point, `~` prefix included.
pub fn point_name(value: u64) -> String {
    if value < 0x100 {
        return format!("~{}", suffix(value as u8));
    }

    let sxz = obfuscate(value);
    let word_count = match value {
        0x100..=0xffff => 1,
        0x1_0000..=0xffff_ffff => 2,
        _ => 4,
    };

    let mut out = String::with_capacity(1 + word_count * 7);
    out.push('~');
    for w in (0..word_count).rev() {
        let word = (sxz >> (w * 16)) as u16;
        out.push_str(prefix((word >> 8) as u8));
        out.push_str(suffix((word & 0xff) as u8));
        if w > 0 {
            out.push('-');
        }
    }
    out
}

/// Parses a phonemic name (leading `~` optional) back to its numeric value.
pub fn parse_name(input: &str) -> Result<u64> {
    let body = input.trim().strip_prefix('~').unwrap_or(input.trim());
    if body.is_empty() {
        return Err(TillerError::invalid_point(input, "empty name"));
    }

    let chunks: Vec<&str> = body.split('-').collect();
    if chunks.len() == 1 && chunks[0].len() == 3 {
        let idx = suffix_index(chunks[0])
            .ok_or_else(|| TillerError::invalid_point(input, "unknown galaxy syllable"))?;
        return Ok(idx as u64);
    }
    if chunks.len() > 4 {
        return Err(TillerError::invalid_point(input, "name too long"));
    }

    let mut value: u64 = 0;
    for chunk in &chunks {
        // Byte length alone is not enough: a multibyte chunk of the right
        // length must not reach the fixed-offset slices below.
        if chunk.len() != 6 || !chunk.is_ascii() {
            return Err(TillerError::invalid_point(input, "malformed syllable pair"));
        }
        let pre = prefix_index(&chunk[..3])
            .ok_or_else(|| TillerError::invalid_point(input, "unknown prefix syllable"))?;
        let suf = suffix_index(&chunk[3..])
            .ok_or_else(|| TillerError::invalid_point(input, "unknown suffix syllable"))?;
        value = (value << 16) | ((pre as u64) << 8) | suf as u64;
    }
    Ok(deobfuscate(value))
}
