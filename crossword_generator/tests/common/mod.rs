#![allow(dead_code)]
use crossword_generator::Dictionary;

/// Short common words built from frequent letters, so that most seeds match several of them
pub const WORDS: &str = "\
RATE TEAR NEAT ANTE SEAT EAST EATS TEAS SATE NEST SENT TENS RENT TERN STAR RATS ARTS TARS
SOAR ORAL ROTE TORE NOTE TONE ONES NOSE EONS SORE ROSE EROS TOES LINE LIEN TILE LITE RILE
LAIR RAIL LIAR SAIL SILT LIST SLIT TAIL DIET TIDE EDIT TIED DEAR READ DARE RODE DOER REDO
NODE DONE DOSE ODES LEAD DEAL LADE SLED LENS CANE ACRE RACE CARE SCAR ARCS CORE CONE ONCE
MEAT TEAM MATE TAME MOST MOTE TOME DOME MODE MORE ROME NAME MANE MEAN AMEN PINE RIPE PIER
TRAIN STAIN SAINT STONE NOTES ONSET TONES RATES STARE TEARS ASTER STEAL LEAST SLATE TALES
CRANE NACRE TRACE CRATE CATER REACT DINER RINSE RESIN SIREN INERT INTER NITRE TRIED TIRED
STRAIN RETAIN RATINE STONER TENSOR TONERS INSERT INTERS ORIENT SENIOR NOSIER TREASON SENATOR";

pub fn word_list() -> Vec<String> {
    WORDS.split_whitespace().map(|w| w.to_string()).collect()
}

pub fn dictionary() -> Dictionary {
    Dictionary::new(word_list())
}
