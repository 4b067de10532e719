//! Built-in base matrices

use super::geometry::QcCode;

/// Lifting size of the IEEE 802.11n N=648 codes
pub const Z_802_11N_648: usize = 27;

/// IEEE 802.11n, N=648, rate 1/2 (Z=27, 12 x 24 blocks)
pub const HBM_802_11N_648_R12: [[i32; 24]; 12] = [
    [0, -1, -1, -1, 0, 0, -1, -1, 0, -1, -1, 0, 1, 0, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1],
    [22, 0, -1, -1, 17, -1, 0, 0, 12, -1, -1, -1, -1, 0, 0, -1, -1, -1, -1, -1, -1, -1, -1, -1],
    [6, -1, 0, -1, 10, -1, -1, -1, 24, -1, 0, -1, -1, -1, 0, 0, -1, -1, -1, -1, -1, -1, -1, -1],
    [2, -1, -1, 0, 20, -1, -1, -1, 25, 0, -1, -1, -1, -1, -1, 0, 0, -1, -1, -1, -1, -1, -1, -1],
    [23, -1, -1, -1, 3, -1, -1, -1, 0, -1, 9, 11, -1, -1, -1, -1, 0, 0, -1, -1, -1, -1, -1, -1],
    [24, -1, 23, 1, 17, -1, 3, -1, 10, -1, -1, -1, -1, -1, -1, -1, -1, 0, 0, -1, -1, -1, -1, -1],
    [25, -1, -1, -1, 8, -1, -1, -1, 7, 18, -1, -1, 0, -1, -1, -1, -1, -1, 0, 0, -1, -1, -1, -1],
    [13, 24, -1, -1, 0, -1, 8, -1, 6, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, 0, 0, -1, -1, -1],
    [7, 20, -1, 16, 22, 10, -1, -1, 23, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, 0, 0, -1, -1],
    [11, -1, -1, -1, 19, -1, -1, -1, 13, -1, 3, 17, -1, -1, -1, -1, -1, -1, -1, -1, -1, 0, 0, -1],
    [25, -1, 8, -1, 23, 18, -1, 14, 9, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, 0, 0],
    [3, -1, -1, -1, 16, -1, -1, 2, 25, 5, -1, -1, 1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, 0],
];

/// Lifting size of the small demonstration code
pub const Z_DEMO: usize = 8;

/// Rate 1/2 dual-diagonal code with N=48, small enough to check by hand
pub const HBM_DEMO: [[i32; 6]; 3] = [
    [1, 5, -1, 2, 0, -1],
    [3, -1, 7, 6, 0, 0],
    [-1, 4, 0, 2, -1, 0],
];

/// IEEE 802.11n N=648 rate 1/2 code
pub fn ieee_802_11n_648_r12() -> QcCode {
    QcCode::new(Z_802_11N_648, &HBM_802_11N_648_R12).expect("802.11n base matrix is valid")
}

/// Small dual-diagonal demonstration code
pub fn demo_code() -> QcCode {
    QcCode::new(Z_DEMO, &HBM_DEMO).expect("demo base matrix is valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_geometries() {
        let wifi = ieee_802_11n_648_r12();
        assert_eq!(wifi.geometry().n(), 648);
        assert_eq!(wifi.geometry().k(), 324);
        assert_eq!(wifi.geometry().g_max(), 8);
        assert_eq!(wifi.rate(), 0.5);

        let demo = demo_code();
        assert_eq!(demo.geometry().n(), 48);
        assert_eq!(demo.geometry().m(), 24);
        assert_eq!(demo.geometry().g_max(), 5);
    }
}
