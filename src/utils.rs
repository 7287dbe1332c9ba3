/*
    Nyx, blazing fast astrodynamics
    Copyright (C) 2023 Christopher Rabotin <christopher.rabotin@gmail.com>

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use crate::linalg::DMatrix;

/// Writes the matrix into the destination slice in row major order.
///
/// # Panics
/// If the slice length does not match the number of elements of the matrix.
pub fn write_row_major(dst: &mut [f64], m: &DMatrix<f64>) {
    assert_eq!(dst.len(), m.len(), "row major slice length mismatch");
    let ncols = m.ncols();
    for i in 0..m.nrows() {
        for j in 0..ncols {
            dst[i * ncols + j] = m[(i, j)];
        }
    }
}

/// Reads an nrows x ncols matrix stored in row major order.
pub fn read_row_major(src: &[f64], nrows: usize, ncols: usize) -> DMatrix<f64> {
    DMatrix::from_row_slice(nrows, ncols, src)
}

/// Returns the root mean square of the provided components, or zero if there are none.
pub fn rms(components: impl ExactSizeIterator<Item = f64>) -> f64 {
    let n = components.len();
    if n == 0 {
        return 0.0;
    }
    (components.map(|x| x * x).sum::<f64>() / n as f64).sqrt()
}

#[test]
fn test_row_major() {
    let m = DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let mut flat = [0.0; 6];
    write_row_major(&mut flat, &m);
    assert_eq!(flat, [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    assert_eq!(read_row_major(&flat, 2, 3), m);
}

#[test]
fn test_rms() {
    assert_eq!(rms(Vec::<f64>::new().into_iter()), 0.0);
    assert!((rms(vec![3.0, 4.0].into_iter()) - (12.5_f64).sqrt()).abs() < 1e-15);
}
