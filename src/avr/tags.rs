//! Node tags used by the AVR assembler's tree (§3, §4.8). One `Sym` per
//! tag, interned once and handed around by value — the AVR analogue of
//! registering a `tndef`/`ntdef` pair per node shape.

use crate::symtab::{Interner, Sym};

macro_rules! tags {
    ($($field:ident => $name:literal),* $(,)?) => {
        #[derive(Clone, Copy, Debug)]
        pub struct Tags {
            $(pub $field: Sym,)*
        }

        impl Tags {
            pub fn new(interner: &mut Interner) -> Self {
                Self {
                    $($field: interner.intern($name),)*
                }
            }
        }
    };
}

tags! {
    program => "PROGRAM",
    mcu => "MCU",
    seg_text => "SEG_TEXT",
    seg_data => "SEG_DATA",
    seg_eeprom => "SEG_EEPROM",
    org => "ORG",
    space => "SPACE",
    space16 => "SPACE16",
    konst => "CONST",
    konst16 => "CONST16",
    equ => "EQU",
    def => "DEF",
    glabel => "GLABEL",
    llabel => "LLABEL",
    instr => "INSTR",
    reg => "REG",
    integer => "INTEGER",
    string => "STRING",
    low => "LOW",
    high => "HIGH",
    labelref => "LABELREF",
    list => "LIST",
    idx_x => "IDX_X",
    idx_x_postinc => "IDX_XPOSTINC",
    idx_x_predec => "IDX_XPREDEC",
    idx_y => "IDX_Y",
    idx_y_postinc => "IDX_YPOSTINC",
    idx_y_predec => "IDX_YPREDEC",
    idx_y_disp => "IDX_YDISP",
    idx_z => "IDX_Z",
    idx_z_postinc => "IDX_ZPOSTINC",
    idx_z_predec => "IDX_ZPREDEC",
    idx_z_disp => "IDX_ZDISP",
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_distinct() {
        let mut interner = Interner::new();
        let tags = Tags::new(&mut interner);
        assert_ne!(tags.program, tags.instr);
        assert_ne!(tags.glabel, tags.llabel);
        assert_eq!(interner.resolve(tags.instr), "INSTR");
    }
}
