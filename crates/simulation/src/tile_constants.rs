//! Cell bit layout and named tile numbers of the classic tile set.

// ---------------------------------------------------------------------------
// Cell bits
// ---------------------------------------------------------------------------

pub const PWRBIT: u16 = 0x8000;
pub const CONDBIT: u16 = 0x4000;
pub const BURNBIT: u16 = 0x2000;
pub const BULLBIT: u16 = 0x1000;
pub const ANIMBIT: u16 = 0x0800;
pub const ZONEBIT: u16 = 0x0400;
pub const ALLBITS: u16 = 0xFC00;
pub const LOMASK: u16 = 0x03FF;

/// Marks "no write" in an edit preview buffer.
pub const CLEAR: u16 = 0xFFFF;

// ---------------------------------------------------------------------------
// Terrain
// ---------------------------------------------------------------------------

pub const DIRT: u16 = 0;
pub const RIVER: u16 = 2;
pub const REDGE: u16 = 3;
pub const CHANNEL: u16 = 4;
pub const FIRSTRIVEDGE: u16 = 5;
pub const LASTRIVEDGE: u16 = 20;
pub const TREEBASE: u16 = 21;
pub const LASTTREE: u16 = 36;
pub const WOODS: u16 = 37;
pub const WOODS_LOW: u16 = TREEBASE;
pub const WOODS_HIGH: u16 = 39;
pub const WOODS2: u16 = 40;
pub const WOODS5: u16 = 43;
pub const RUBBLE: u16 = 44;
pub const LASTRUBBLE: u16 = 47;
pub const FLOOD: u16 = 48;
pub const LASTFLOOD: u16 = 51;
pub const RADTILE: u16 = 52;
pub const FIRE: u16 = 56;
pub const LASTFIRE: u16 = 63;

// ---------------------------------------------------------------------------
// Roads
// ---------------------------------------------------------------------------

pub const ROADBASE: u16 = 64;
pub const HBRIDGE: u16 = 64;
pub const VBRIDGE: u16 = 65;
pub const ROADS: u16 = 66;
pub const ROADS2: u16 = 67;
pub const ROADS3: u16 = 68;
pub const ROADS4: u16 = 69;
pub const ROADS5: u16 = 70;
pub const ROADS6: u16 = 71;
pub const ROADS7: u16 = 72;
pub const ROADS8: u16 = 73;
pub const ROADS9: u16 = 74;
pub const ROADS10: u16 = 75;
pub const INTERSECTION: u16 = 76;
pub const HROADPOWER: u16 = 77;
pub const VROADPOWER: u16 = 78;
pub const BRWH: u16 = 79;
pub const LTRFBASE: u16 = 80;
pub const BRWV: u16 = 95;
pub const HTRFBASE: u16 = 144;
pub const LASTROAD: u16 = 206;

// ---------------------------------------------------------------------------
// Power lines
// ---------------------------------------------------------------------------

pub const POWERBASE: u16 = 208;
pub const HPOWER: u16 = 208;
pub const VPOWER: u16 = 209;
pub const LHPOWER: u16 = 210;
pub const LVPOWER: u16 = 211;
pub const LVPOWER2: u16 = 212;
pub const LVPOWER3: u16 = 213;
pub const LVPOWER4: u16 = 214;
pub const LVPOWER5: u16 = 215;
pub const LVPOWER6: u16 = 216;
pub const LVPOWER7: u16 = 217;
pub const LVPOWER8: u16 = 218;
pub const LVPOWER9: u16 = 219;
pub const LVPOWER10: u16 = 220;
pub const RAILHPOWERV: u16 = 221;
pub const RAILVPOWERH: u16 = 222;
pub const LASTPOWER: u16 = 222;

// ---------------------------------------------------------------------------
// Rail
// ---------------------------------------------------------------------------

pub const RAILBASE: u16 = 224;
pub const HRAIL: u16 = 224;
pub const VRAIL: u16 = 225;
pub const LHRAIL: u16 = 226;
pub const LVRAIL: u16 = 227;
pub const LVRAIL2: u16 = 228;
pub const LVRAIL3: u16 = 229;
pub const LVRAIL4: u16 = 230;
pub const LVRAIL5: u16 = 231;
pub const LVRAIL6: u16 = 232;
pub const LVRAIL7: u16 = 233;
pub const LVRAIL8: u16 = 234;
pub const LVRAIL9: u16 = 235;
pub const LVRAIL10: u16 = 236;
pub const HRAILROAD: u16 = 237;
pub const VRAILROAD: u16 = 238;
pub const LASTRAIL: u16 = 238;

// ---------------------------------------------------------------------------
// Zones
// ---------------------------------------------------------------------------

pub const RESBASE: u16 = 240;
pub const RESCLR: u16 = 244;
pub const HOUSE: u16 = 249;
pub const LHTHR: u16 = 249;
pub const HHTHR: u16 = 260;
pub const RZB: u16 = 265;
pub const HOSPITALBASE: u16 = 405;
pub const HOSPITAL: u16 = 409;
pub const CHURCHBASE: u16 = 414;
pub const CHURCH: u16 = 418;
pub const COMBASE: u16 = 423;
pub const COMCLR: u16 = 427;
pub const CZB: u16 = 436;
pub const INDBASE: u16 = 612;
pub const INDCLR: u16 = 616;
pub const IZB: u16 = 625;
pub const LASTIND: u16 = 692;
pub const PORTBASE: u16 = 693;
pub const PORT: u16 = 698;
pub const AIRPORTBASE: u16 = 709;
pub const RADTOWER: u16 = 711;
pub const AIRPORT: u16 = 716;
pub const COALBASE: u16 = 745;
pub const POWERPLANT: u16 = 750;
pub const LASTPOWERPLANT: u16 = 760;
pub const FIRESTBASE: u16 = 761;
pub const FIRESTATION: u16 = 765;
pub const POLICESTBASE: u16 = 770;
pub const POLICESTATION: u16 = 774;
pub const STADIUMBASE: u16 = 779;
pub const STADIUM: u16 = 784;
pub const FULLSTADIUMBASE: u16 = 795;
pub const FULLSTADIUM: u16 = 800;
pub const NUCLEARBASE: u16 = 811;
pub const NUCLEAR: u16 = 816;
pub const LASTZONE: u16 = 826;

// ---------------------------------------------------------------------------
// Animation and miscellany
// ---------------------------------------------------------------------------

pub const LIGHTNINGBOLT: u16 = 827;
pub const HBRDG0: u16 = 828;
pub const HBRDG1: u16 = 829;
pub const HBRDG2: u16 = 830;
pub const HBRDG3: u16 = 831;
pub const RADAR0: u16 = 832;
pub const LASTRADAR: u16 = 839;
pub const FOUNTAIN: u16 = 840;
pub const LASTFOUNTAIN: u16 = 843;
pub const TINYEXP: u16 = 860;
pub const LASTTINYEXP: u16 = 867;
pub const COALSMOKE1: u16 = 916;
pub const COALSMOKE2: u16 = 920;
pub const COALSMOKE3: u16 = 924;
pub const COALSMOKE4: u16 = 928;
pub const FOOTBALLGAME1: u16 = 932;
pub const FOOTBALLGAME2: u16 = 940;
pub const VBRDG0: u16 = 948;
pub const VBRDG1: u16 = 949;
pub const VBRDG2: u16 = 950;
pub const VBRDG3: u16 = 951;
pub const NUCLEAR_SWIRL: u16 = 952;
pub const LAST_NUCLEAR_SWIRL: u16 = 955;

pub const TILE_COUNT: usize = 960;

// ---------------------------------------------------------------------------
// Connectivity glyph tables
// ---------------------------------------------------------------------------

/// Road glyph for an N=1, E=2, S=4, W=8 neighbour mask.
pub const ROAD_TABLE: [u16; 16] = [
    ROADS, ROADS2, ROADS, ROADS3, ROADS2, ROADS2, ROADS4, ROADS8, ROADS, ROADS6, ROADS, ROADS7,
    ROADS5, ROADS10, ROADS9, INTERSECTION,
];

pub const RAIL_TABLE: [u16; 16] = [
    LHRAIL, LVRAIL, LHRAIL, LVRAIL2, LVRAIL, LVRAIL, LVRAIL3, LVRAIL7, LHRAIL, LVRAIL5, LHRAIL,
    LVRAIL6, LVRAIL4, LVRAIL9, LVRAIL8, LVRAIL10,
];

pub const WIRE_TABLE: [u16; 16] = [
    LHPOWER, LVPOWER, LHPOWER, LVPOWER2, LVPOWER, LVPOWER, LVPOWER3, LVPOWER7, LHPOWER, LVPOWER5,
    LHPOWER, LVPOWER6, LVPOWER4, LVPOWER9, LVPOWER8, LVPOWER10,
];
