//! 18-bit machine words.

pub type Word = u32;

pub const WORD_BITS: u32 = 18;
pub const WORD_MASK: Word = (1 << WORD_BITS) - 1;

/// Short VALUE operand range (signed 8 bit).
pub const VALUE_RANGE: (i64, i64) = (-128, 127);
/// Short branch displacement range (signed 9 bit).
pub const BRANCH_RANGE: (i64, i64) = (-256, 255);
/// Short indexed displacement range. `0x1F` is the escape.
pub const DISP_RANGE: (Word, Word) = (0, 30);

/// Reduce any integer to an 18-bit word (two's complement wrap).
pub fn wrap(value: i64) -> Word {
    (value.rem_euclid(1 << WORD_BITS)) as Word
}

/// Read an 18-bit word as a signed value.
pub fn to_signed(word: Word) -> i64 {
    let word = (word & WORD_MASK) as i64;
    if word >= 1 << (WORD_BITS - 1) {
        word - (1 << WORD_BITS)
    } else {
        word
    }
}

pub fn in_range(word: Word, (lo, hi): (i64, i64)) -> bool {
    let v = to_signed(word);
    lo <= v && v <= hi
}

pub fn fits_value(word: Word) -> bool {
    in_range(word, VALUE_RANGE)
}

pub fn fits_branch(word: Word) -> bool {
    in_range(word, BRANCH_RANGE)
}

pub fn fits_disp(word: Word) -> bool {
    DISP_RANGE.0 <= word && word <= DISP_RANGE.1
}

/// Sign-extend the low `bits` of `field` to a full word.
pub fn sign_extend(field: Word, bits: u32) -> Word {
    let field = field & ((1 << bits) - 1);
    if field & (1 << (bits - 1)) != 0 {
        (field | !((1 << bits) - 1)) & WORD_MASK
    } else {
        field
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_negative() {
        assert_eq!(wrap(-1), 0x3FFFF);
        assert_eq!(wrap(-128), 0x3FF80);
        assert_eq!(wrap(1 << 18), 0);
    }

    #[test]
    fn signed_view() {
        assert_eq!(to_signed(0x3FFFF), -1);
        assert_eq!(to_signed(0x1FFFF), 0x1FFFF);
        assert_eq!(to_signed(0x20000), -(1 << 17));
    }

    #[test]
    fn value_boundaries() {
        assert!(fits_value(wrap(127)));
        assert!(fits_value(wrap(-128)));
        assert!(!fits_value(wrap(128)));
        assert!(!fits_value(wrap(-129)));
    }

    #[test]
    fn branch_boundaries() {
        assert!(fits_branch(wrap(255)));
        assert!(fits_branch(wrap(-256)));
        assert!(!fits_branch(wrap(256)));
        assert!(!fits_branch(wrap(-257)));
    }

    #[test]
    fn disp_boundaries() {
        assert!(fits_disp(0));
        assert!(fits_disp(30));
        assert!(!fits_disp(31));
        assert!(!fits_disp(wrap(-1)));
    }

    #[test]
    fn extend() {
        assert_eq!(sign_extend(0x80, 8), wrap(-128));
        assert_eq!(sign_extend(0x7F, 8), 0x7F);
        assert_eq!(sign_extend(0x1FF, 9), wrap(-1));
    }
}
