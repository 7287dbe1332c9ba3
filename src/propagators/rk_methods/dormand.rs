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

use super::RK;

/// `Dormand45` is a [Dormand-Prince integrator](https://en.wikipedia.org/wiki/Dormand%E2%80%93Prince_method),
/// of order 5 with an embedded order 4 error estimate.
///
/// The last stage is evaluated at the end of the step on the solution itself ("first same as last"), so
/// it is reused as the first stage of the next step. Its continuous extension is the fourth order dense
/// output of Hairer, Norsett and Wanner.
pub struct Dormand45 {}

impl RK for Dormand45 {
    const ORDER: u8 = 5;
    const STAGES: usize = 7;
    const A_COEFFS: &'static [f64] = &[
        1.0 / 5.0,
        3.0 / 40.0,
        9.0 / 40.0,
        44.0 / 45.0,
        -56.0 / 15.0,
        32.0 / 9.0,
        19_372.0 / 6_561.0,
        -25_360.0 / 2_187.0,
        64_448.0 / 6_561.0,
        -212.0 / 729.0,
        9_017.0 / 3_168.0,
        -355.0 / 33.0,
        46_732.0 / 5_247.0,
        49.0 / 176.0,
        -5_103.0 / 18_656.0,
        35.0 / 384.0,
        0.0,
        500.0 / 1_113.0,
        125.0 / 192.0,
        -2_187.0 / 6_784.0,
        11.0 / 84.0,
    ];
    const B_COEFFS: &'static [f64] = &[
        35.0 / 384.0,
        0.0,
        500.0 / 1_113.0,
        125.0 / 192.0,
        -2_187.0 / 6_784.0,
        11.0 / 84.0,
        0.0,
        5_179.0 / 57_600.0,
        0.0,
        7_571.0 / 16_695.0,
        393.0 / 640.0,
        -92_097.0 / 339_200.0,
        187.0 / 2_100.0,
        1.0 / 40.0,
    ];
    const DENSE_ORDER: usize = 4;
    const DENSE_COEFFS: &'static [f64] = &[
        1.0,
        -8_048_581_381.0 / 2_820_520_608.0,
        8_663_915_743.0 / 2_820_520_608.0,
        -12_715_105_075.0 / 11_282_082_432.0,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
        131_558_114_200.0 / 32_700_410_799.0,
        -68_118_460_800.0 / 10_900_136_933.0,
        87_487_479_700.0 / 32_700_410_799.0,
        0.0,
        -1_754_552_775.0 / 470_086_768.0,
        14_199_869_525.0 / 1_410_260_304.0,
        -10_690_763_975.0 / 1_880_347_072.0,
        0.0,
        127_303_824_393.0 / 49_829_197_408.0,
        -318_862_633_887.0 / 49_829_197_408.0,
        701_980_252_875.0 / 199_316_789_632.0,
        0.0,
        -282_668_133.0 / 205_662_961.0,
        2_019_193_451.0 / 616_988_883.0,
        -1_453_857_185.0 / 822_651_844.0,
        0.0,
        40_617_522.0 / 29_380_423.0,
        -110_615_467.0 / 29_380_423.0,
        69_997_945.0 / 29_380_423.0,
    ];
}

/// `Dormand853` is the eighth order Dormand-Prince integrator (DOP853 of Hairer, Norsett and Wanner) with
/// embedded fifth and third order estimates.
///
/// Its error estimate combines both embedded solutions, and its continuous extension is of order seven.
/// That extension needs the derivative at the end of the step and three more stages, which are only
/// evaluated once the step is accepted. The dense coefficients are expanded in powers of θ.
pub struct Dormand853 {}

impl RK for Dormand853 {
    const ORDER: u8 = 8;
    const STAGES: usize = 12;
    const A_COEFFS: &'static [f64] = &[
        0.05260015195876773,
        0.0197250569845379,
        0.0591751709536137,
        0.02958758547680685,
        0.0,
        0.08876275643042054,
        0.2413651341592667,
        0.0,
        -0.8845494793282861,
        0.924834003261792,
        0.037037037037037035,
        0.0,
        0.0,
        0.17082860872947386,
        0.12546768756682242,
        0.037109375,
        0.0,
        0.0,
        0.17025221101954405,
        0.06021653898045596,
        -0.017578125,
        0.03709200011850479,
        0.0,
        0.0,
        0.17038392571223998,
        0.10726203044637328,
        -0.015319437748624402,
        0.008273789163814023,
        0.6241109587160757,
        0.0,
        0.0,
        -3.3608926294469414,
        -0.868219346841726,
        27.59209969944671,
        20.154067550477894,
        -43.48988418106996,
        0.47766253643826434,
        0.0,
        0.0,
        -2.4881146199716677,
        -0.590290826836843,
        21.230051448181193,
        15.279233632882423,
        -33.28821096898486,
        -0.020331201708508627,
        -0.9371424300859873,
        0.0,
        0.0,
        5.186372428844064,
        1.0914373489967295,
        -8.149787010746927,
        -18.52006565999696,
        22.739487099350505,
        2.4936055526796523,
        -3.0467644718982196,
        2.273310147516538,
        0.0,
        0.0,
        -10.53449546673725,
        -2.0008720582248625,
        -17.9589318631188,
        27.94888452941996,
        -2.8589982771350235,
        -8.87285693353063,
        12.360567175794303,
        0.6433927460157636,
    ];
    const B_COEFFS: &'static [f64] = &[
        // Eighth order solution
        0.054293734116568765,
        0.0,
        0.0,
        0.0,
        0.0,
        4.450312892752409,
        1.8915178993145003,
        -5.801203960010585,
        0.3111643669578199,
        -0.1521609496625161,
        0.20136540080403034,
        0.04471061572777259,
        // Fifth order embedded solution
        0.04117368912237388,
        0.0,
        0.0,
        0.0,
        0.0,
        5.675469339128614,
        2.3872768489717506,
        -7.465581142465571,
        0.6614932157077936,
        -0.48634006837553356,
        0.11944219431891463,
        0.06706592359165889,
    ];
    const LOW_ORDER_COEFFS: &'static [f64] = &[
        0.2440944881889764,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
        0.7338466882816118,
        0.0,
        0.0,
        0.022058823529411766,
    ];
    const DENSE_STAGES: usize = 4;
    const DENSE_A_COEFFS: &'static [f64] = &[
        0.056167502283047954,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
        0.25350021021662483,
        -0.2462390374708025,
        -0.12419142326381637,
        0.15329179827876568,
        0.00820105229563469,
        0.007567897660545699,
        -0.008298,
        0.03183464816350214,
        0.0,
        0.0,
        0.0,
        0.0,
        0.028300909672366776,
        0.053541988307438566,
        -0.05492374857139099,
        0.0,
        0.0,
        -0.00010834732869724932,
        0.0003825710908356584,
        -0.00034046500868740456,
        0.1413124436746325,
        -0.42889630158379194,
        0.0,
        0.0,
        0.0,
        0.0,
        -4.697621415361164,
        7.683421196062599,
        4.06898981839711,
        0.3567271874552811,
        0.0,
        0.0,
        0.0,
        -0.0013990241651590145,
        2.9475147891527724,
        -9.15095847217987,
    ];
    const DENSE_ORDER: usize = 7;
    const DENSE_COEFFS: &'static [f64] = &[
        1.0,
        -10.266057073759306,
        48.161850968566455,
        -114.93304874997833,
        147.46446875669767,
        -97.06685363011368,
        25.69393346270375,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
        13.917653631776604,
        -154.78787266663716,
        522.9219089608218,
        -456.25918840208783,
        -75.53193732135753,
        154.18974869023643,
        0.0,
        2.6056037519936095,
        -21.622822384626506,
        2.535182028966755,
        292.25417465990404,
        -505.40999933296894,
        231.5293791760455,
        0.0,
        -15.018944223519684,
        160.09447708973047,
        -474.3071826037644,
        135.96036916173838,
        545.1091945264187,
        -357.6391179106141,
        0.0,
        3.050527683318488,
        -38.54396729189063,
        174.47140009219885,
        -337.0513470238771,
        291.78987509083254,
        -93.40532418362432,
        0.0,
        -1.3278744327655212,
        16.661770430049543,
        -74.44027814126304,
        140.75210016191608,
        -119.2562021040512,
        37.45832313645163,
        0.0,
        2.844533632672879,
        -36.55829548991012,
        170.69007169147514,
        -345.9748485480496,
        313.299553623578,
        -104.0996495089623,
        0.0,
        0.7657106259527866,
        -9.906995535619366,
        46.8029919188744,
        -96.5198694669957,
        88.74316650017616,
        -29.8402934266605,
        0.0,
        -1.0889903364513334,
        14.097013042320002,
        -66.68230591294363,
        137.96299063474376,
        -127.82216401767992,
        43.53345659001114,
        0.0,
        18.148505520854727,
        -127.63310949253875,
        357.3419516129657,
        -500.7031507909224,
        349.17035710882897,
        -96.32455395918828,
        0.0,
        -9.194632392478356,
        93.3567459327894,
        -282.6272618704363,
        361.14007718803333,
        -201.85219053352347,
        39.17726167561544,
        0.0,
        -4.436036387594894,
        56.68120539776666,
        -261.77342902691703,
        520.9742236688993,
        -461.17279991013964,
        149.72683625798564,
    ];
}
