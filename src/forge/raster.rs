//! Pixel-level sampling of a grayscale region.
//!
//! A [`Raster`] pairs an image with its background level and a darkness
//! threshold. Everything the geometric passes need from pixels goes through
//! here: darkness tests, stroke thickness runs, gap detection between
//! parallel strokes, blob areas, stroke-width statistics and thinning.

use image::{GrayImage, Luma, imageops};

use crate::model::geometry::Point;

/// Longest run counted by [`Raster::noise_factor`].
const MAX_RUN: usize = 40;

#[derive(Debug, Clone)]
pub struct Raster {
    image: GrayImage,
    background: u8,
    /// Darkness threshold as a fraction of full scale.
    threshold: f64,
}

/// Stroke-width statistics of a raster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseFactor {
    /// Ratio of neighboring run-length counts around the dominant width.
    pub factor: f64,
    /// Most frequent run length (the dominant stroke width).
    pub max_hist: usize,
    /// Ratio of width-4 to width-5 runs.
    pub nf45: f64,
}

impl Raster {
    /// Wraps an image, estimating the background as its most common level.
    pub fn new(image: GrayImage, threshold: f64) -> Self {
        let background = estimate_background(&image);
        Self {
            image,
            background,
            threshold,
        }
    }

    pub fn with_background(image: GrayImage, background: u8, threshold: f64) -> Self {
        Self {
            image,
            background,
            threshold,
        }
    }

    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn background(&self) -> u8 {
        self.background
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Ink test; pixels outside the image are background.
    pub fn is_dark(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x >= i64::from(self.width()) || y >= i64::from(self.height()) {
            return false;
        }
        let v = self.image.get_pixel(x as u32, y as u32)[0];
        (f64::from(v) - f64::from(self.background)).abs() / 255.0 > self.threshold
    }

    /// Horizontal ink run through `(x, y)`, probing one pixel either side
    /// when the start pixel itself is blank.
    ///
    /// Measures the run length plus one, so a hairline reads 2 and a miss
    /// reads 0.
    pub fn thickness_hor(&self, x: i64, y: i64) -> u32 {
        self.run_through(x, y, 1, 0)
    }

    /// Vertical ink run through `(x, y)`.
    pub fn thickness_ver(&self, x: i64, y: i64) -> u32 {
        self.run_through(x, y, 0, 1)
    }

    fn run_through(&self, x: i64, y: i64, dx: i64, dy: i64) -> u32 {
        let (mut x, mut y) = (x, y);
        let (w, h) = (i64::from(self.width()), i64::from(self.height()));
        let mut dark = self.is_dark(x, y);
        if !dark && x + dx < w && y + dy < h {
            x += dx;
            y += dy;
            dark = self.is_dark(x, y);
        }
        if !dark && x - 2 * dx >= 0 && y - 2 * dy >= 0 {
            x -= 2 * dx;
            y -= 2 * dy;
            dark = self.is_dark(x, y);
        }
        if !dark {
            return 0;
        }
        let mut forward = 0;
        while self.is_dark(x + (forward + 1) * dx, y + (forward + 1) * dy) {
            forward += 1;
        }
        let mut backward = 0;
        while self.is_dark(x - (backward + 1) * dx, y - (backward + 1) * dy) {
            backward += 1;
        }
        (forward + backward + 2) as u32
    }

    /// Whether the strip between segments `ai → bi` and `aj → bj` is mostly
    /// ink, i.e. they are the two edges of one thick stroke.
    ///
    /// Scans along the dominant axis of the first segment over the range
    /// where both overlap; a scan line counts as white if any pixel between
    /// the two segments is blank. Returns `false` when more than half of the
    /// scan lines are white.
    pub fn no_white_space(&self, ai: Point, bi: Point, aj: Point, bj: Point) -> bool {
        let (dx1, dy1) = (bi.x - ai.x, bi.y - ai.y);
        let (dx2, dy2) = (bj.x - aj.x, bj.y - aj.y);
        let horizontal = dx1.abs() > dy1.abs();

        // Work in (u, v) where u runs along the dominant axis.
        let (u_ai, v_ai, u_bi, u_aj, v_aj, u_bj) = if horizontal {
            (ai.x, ai.y, bi.x, aj.x, aj.y, bj.x)
        } else {
            (ai.y, ai.x, bi.y, aj.y, aj.x, bj.y)
        };
        let (k1, k2) = if horizontal {
            (dy1 / dx1, dy2 / dx2)
        } else {
            (dx1 / dy1, dx2 / dy2)
        };
        let mut xx = [u_ai, u_bi, u_aj, u_bj];
        xx.sort_by(f64::total_cmp);

        let start = u_ai as i64;
        let end = u_bi as i64;
        let step = if (if horizontal { dx1 } else { dy1 }) > 0.0 { 1 } else { -1 };

        let mut total = 0usize;
        let mut white = 0usize;
        let mut u = start;
        while u != end {
            let uf = u as f64;
            if uf > xx[1] && uf < xx[2] {
                let p1 = (uf - u_ai) * k1 + v_ai;
                let p2 = (uf - u_aj) * k2 + v_aj;
                if (p2 - p1).abs() >= 1.0 && k1.is_finite() && k2.is_finite() {
                    let dp = if p2 > p1 { 1 } else { -1 };
                    let stop = p2 as i64;
                    let mut v = p1 as i64 + dp;
                    let mut line_white = false;
                    while (stop - v) * dp > 0 {
                        let dark = if horizontal {
                            self.is_dark(u, v)
                        } else {
                            self.is_dark(v, u)
                        };
                        if !dark {
                            line_white = true;
                        }
                        v += dp;
                    }
                    total += 1;
                    if line_white {
                        white += 1;
                    }
                }
            }
            u += step;
        }
        total == 0 || white as f64 / total as f64 <= 0.5
    }

    /// Ink mask indexed `[x][y]`: 1 for dark pixels, 0 otherwise.
    pub fn dark_mask(&self) -> Vec<Vec<u8>> {
        (0..i64::from(self.width()))
            .map(|x| {
                (0..i64::from(self.height()))
                    .map(|y| u8::from(self.is_dark(x, y)))
                    .collect()
            })
            .collect()
    }

    /// Run-length histogram of ink along rows and columns.
    pub fn noise_factor(&self) -> NoiseFactor {
        let mut hist = [0.0f64; MAX_RUN];
        let (w, h) = (i64::from(self.width()), i64::from(self.height()));
        let mut count_runs = |len: i64, dark: &dyn Fn(i64) -> bool| {
            let mut j = 0;
            while j < len {
                while j < len && !dark(j) {
                    j += 1;
                }
                let mut run = 0usize;
                while j < len && dark(j) {
                    run += 1;
                    j += 1;
                }
                if run < MAX_RUN {
                    hist[run] += 1.0;
                }
            }
        };
        for x in 0..w {
            count_runs(h, &|y| self.is_dark(x, y));
        }
        for y in 0..h {
            count_runs(w, &|x| self.is_dark(x, y));
        }

        let mut max_hist = 1;
        let mut max_v = 0.0;
        for (l, &v) in hist.iter().enumerate().skip(1) {
            if v > max_v {
                max_v = v;
                max_hist = l;
            }
        }
        let ratio = |a: f64, b: f64| if b != 0.0 { a / b } else { 0.0 };
        let factor = match max_hist {
            m if m > 2 => ratio(hist[2], hist[3]),
            2 => ratio(hist[1], hist[2]),
            _ => ratio(hist[2], hist[1]),
        };
        NoiseFactor {
            factor,
            max_hist,
            nf45: ratio(hist[4], hist[5]),
        }
    }

    /// Binarized copy: ink pixels 0, everything else 255.
    pub fn binarize(&self) -> GrayImage {
        let mut out = GrayImage::from_pixel(self.width(), self.height(), Luma([255]));
        for (x, y, p) in out.enumerate_pixels_mut() {
            if self.is_dark(i64::from(x), i64::from(y)) {
                *p = Luma([0]);
            }
        }
        out
    }

    /// One-pixel-wide skeleton of the ink as a binarized raster.
    pub fn thin(&self) -> Raster {
        let (w, h) = (self.width() as usize, self.height() as usize);
        let mut mask: Vec<bool> = (0..h)
            .flat_map(|y| (0..w).map(move |x| (x, y)))
            .map(|(x, y)| self.is_dark(x as i64, y as i64))
            .collect();
        thin_mask(&mut mask, w, h);

        let mut out = GrayImage::from_pixel(self.width(), self.height(), Luma([255]));
        for (i, &ink) in mask.iter().enumerate() {
            if ink {
                out.put_pixel((i % w) as u32, (i / w) as u32, Luma([0]));
            }
        }
        Raster::with_background(out, 255, 0.5)
    }

    /// Uniformly scaled copy.
    pub fn scaled(&self, factor: f64) -> Raster {
        let w = ((f64::from(self.width()) * factor).round() as u32).max(1);
        let h = ((f64::from(self.height()) * factor).round() as u32).max(1);
        let image = imageops::resize(&self.image, w, h, imageops::FilterType::Triangle);
        Raster::with_background(image, self.background, self.threshold)
    }

    /// Copy of the inclusive box `(x1, y1)–(x2, y2)` surrounded by a
    /// background-filled margin of `frame` pixels, sampled at `threshold`.
    ///
    /// Parts of the box outside the image stay background.
    pub fn framed_region(&self, x1: u32, y1: u32, x2: u32, y2: u32, frame: u32, threshold: f64) -> Raster {
        let w = x2.saturating_sub(x1) + 1;
        let h = y2.saturating_sub(y1) + 1;
        let mut canvas = GrayImage::from_pixel(w + 2 * frame, h + 2 * frame, Luma([self.background]));
        let part = imageops::crop_imm(&self.image, x1, y1, w, h).to_image();
        imageops::replace(&mut canvas, &part, i64::from(frame), i64::from(frame));
        Raster::with_background(canvas, self.background, threshold)
    }
}

/// Flood-fills the 8-connected blob of the mask containing `center`.
///
/// Visited pixels are cleared. Returns the blob's pixel count and moves
/// `center` to its centroid; returns 0 and leaves `center` alone when the
/// start pixel is not ink.
pub fn count_area(mask: &mut [Vec<u8>], center: &mut Point) -> usize {
    let w = mask.len() as i64;
    let h = mask.first().map_or(0, |c| c.len()) as i64;
    let (x0, y0) = (center.x as i64, center.y as i64);
    if x0 < 0 || y0 < 0 || x0 >= w || y0 >= h || mask[x0 as usize][y0 as usize] != 1 {
        return 0;
    }
    let mut queue = std::collections::VecDeque::new();
    mask[x0 as usize][y0 as usize] = 2;
    queue.push_back((x0, y0));
    let (mut area, mut sx, mut sy) = (0usize, 0i64, 0i64);
    while let Some((x, y)) = queue.pop_front() {
        mask[x as usize][y as usize] = 0;
        area += 1;
        sx += x;
        sy += y;
        for i in x - 1..=x + 1 {
            for j in y - 1..=y + 1 {
                if i >= 0 && j >= 0 && i < w && j < h && mask[i as usize][j as usize] == 1 {
                    mask[i as usize][j as usize] = 2;
                    queue.push_back((i, j));
                }
            }
        }
    }
    center.x = sx as f64 / area as f64;
    center.y = sy as f64 / area as f64;
    area
}

/// Most frequent gray level.
fn estimate_background(image: &GrayImage) -> u8 {
    let mut hist = [0usize; 256];
    for p in image.pixels() {
        hist[p[0] as usize] += 1;
    }
    if image.width() == 0 || image.height() == 0 {
        return 255;
    }
    hist.iter()
        .enumerate()
        .max_by_key(|&(level, &n)| (n, level))
        .map_or(255, |(level, _)| level as u8)
}

/// Two-subiteration parallel thinning on a row-major mask.
fn thin_mask(mask: &mut [bool], w: usize, h: usize) {
    let at = |m: &[bool], x: i64, y: i64| -> bool {
        x >= 0 && y >= 0 && (x as usize) < w && (y as usize) < h && m[y as usize * w + x as usize]
    };
    loop {
        let mut changed = false;
        for pass in 0..2 {
            let mut clear = Vec::new();
            for y in 0..h as i64 {
                for x in 0..w as i64 {
                    if !at(mask, x, y) {
                        continue;
                    }
                    // N, NE, E, SE, S, SW, W, NW
                    let n = [
                        at(mask, x, y - 1),
                        at(mask, x + 1, y - 1),
                        at(mask, x + 1, y),
                        at(mask, x + 1, y + 1),
                        at(mask, x, y + 1),
                        at(mask, x - 1, y + 1),
                        at(mask, x - 1, y),
                        at(mask, x - 1, y - 1),
                    ];
                    let neighbors = n.iter().filter(|&&v| v).count();
                    if !(2..=6).contains(&neighbors) {
                        continue;
                    }
                    let transitions = (0..8).filter(|&i| !n[i] && n[(i + 1) % 8]).count();
                    if transitions != 1 {
                        continue;
                    }
                    let (p2, p4, p6, p8) = (n[0], n[2], n[4], n[6]);
                    let removable = if pass == 0 {
                        !(p2 && p4 && p6) && !(p4 && p6 && p8)
                    } else {
                        !(p2 && p4 && p8) && !(p2 && p6 && p8)
                    };
                    if removable {
                        clear.push(y as usize * w + x as usize);
                    }
                }
            }
            changed |= !clear.is_empty();
            for i in clear {
                mask[i] = false;
            }
        }
        if !changed {
            break;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// White canvas of the given size.
    pub(crate) fn make_canvas(w: u32, h: u32) -> GrayImage {
        GrayImage::from_pixel(w, h, Luma([255]))
    }

    /// Paints an axis-aligned filled rectangle, bounds inclusive.
    pub(crate) fn fill_rect(img: &mut GrayImage, x1: u32, y1: u32, x2: u32, y2: u32) {
        for x in x1..=x2 {
            for y in y1..=y2 {
                img.put_pixel(x, y, Luma([0]));
            }
        }
    }

    #[test]
    fn framed_region_pads_with_background() {
        let mut img = make_canvas(40, 40);
        fill_rect(&mut img, 10, 10, 12, 12);
        let raster = Raster::new(img, 0.4);
        let region = raster.framed_region(10, 10, 19, 19, 5, 0.3);

        assert_eq!((region.width(), region.height()), (20, 20));
        assert_eq!(region.threshold(), 0.3);
        assert!(region.is_dark(5, 5));
        assert!(region.is_dark(7, 7));
        assert!(!region.is_dark(4, 5));
        assert!(!region.is_dark(8, 8));
    }

    #[test]
    fn background_is_most_common_level() {
        let mut img = make_canvas(10, 10);
        fill_rect(&mut img, 0, 0, 2, 2);
        let raster = Raster::new(img, 0.4);
        assert_eq!(raster.background(), 255);
        assert!(raster.is_dark(1, 1));
        assert!(!raster.is_dark(5, 5));
        assert!(!raster.is_dark(-1, 0));
        assert!(!raster.is_dark(10, 0));
    }

    #[test]
    fn thickness_runs_measure_stroke_width() {
        let mut img = make_canvas(30, 30);
        fill_rect(&mut img, 5, 10, 25, 14);
        let raster = Raster::new(img, 0.4);
        assert_eq!(raster.thickness_ver(15, 12), 6);
        assert_eq!(raster.thickness_hor(15, 12), 22);
    }

    #[test]
    fn thickness_checks_adjacent_pixel_when_start_is_blank() {
        let mut img = make_canvas(20, 20);
        fill_rect(&mut img, 11, 5, 11, 15);
        let raster = Raster::new(img, 0.4);
        assert_eq!(raster.thickness_hor(10, 10), 2);
        assert_eq!(raster.thickness_hor(12, 10), 2);
        assert_eq!(raster.thickness_hor(14, 10), 0);
        assert_eq!(raster.thickness_ver(10, 10), 0);
        assert_eq!(raster.thickness_ver(11, 10), 12);
    }

    #[test]
    fn filled_strip_between_edges_has_no_white_space() {
        let mut img = make_canvas(40, 20);
        fill_rect(&mut img, 5, 5, 35, 11);
        let raster = Raster::new(img, 0.4);
        let filled = raster.no_white_space(
            Point::new(5.0, 5.0),
            Point::new(35.0, 5.0),
            Point::new(5.0, 11.0),
            Point::new(35.0, 11.0),
        );
        assert!(filled);
    }

    #[test]
    fn two_separate_lines_have_white_space() {
        let mut img = make_canvas(40, 20);
        fill_rect(&mut img, 5, 5, 35, 5);
        fill_rect(&mut img, 5, 11, 35, 11);
        let raster = Raster::new(img, 0.4);
        let filled = raster.no_white_space(
            Point::new(5.0, 5.0),
            Point::new(35.0, 5.0),
            Point::new(5.0, 11.0),
            Point::new(35.0, 11.0),
        );
        assert!(!filled);
    }

    #[test]
    fn count_area_fills_blob_and_moves_to_centroid() {
        let mut img = make_canvas(20, 20);
        fill_rect(&mut img, 4, 4, 6, 6);
        fill_rect(&mut img, 15, 15, 16, 16);
        let raster = Raster::new(img, 0.4);
        let mut mask = raster.dark_mask();
        let mut c = Point::new(4.0, 4.0);
        assert_eq!(count_area(&mut mask, &mut c), 9);
        assert!((c.x - 5.0).abs() < 1e-9 && (c.y - 5.0).abs() < 1e-9);
        // Already consumed.
        let mut again = Point::new(5.0, 5.0);
        assert_eq!(count_area(&mut mask, &mut again), 0);
        let mut other = Point::new(15.0, 15.0);
        assert_eq!(count_area(&mut mask, &mut other), 4);
    }

    #[test]
    fn noise_factor_finds_dominant_stroke_width() {
        let mut img = make_canvas(60, 60);
        for k in 0..5 {
            let y = 5 + k * 10;
            fill_rect(&mut img, 5, y, 55, y + 3);
        }
        let raster = Raster::new(img, 0.4);
        assert_eq!(raster.noise_factor().max_hist, 4);
    }

    #[test]
    fn thinning_reduces_a_bar_to_a_line() {
        let mut img = make_canvas(40, 20);
        fill_rect(&mut img, 5, 8, 34, 12);
        let raster = Raster::new(img, 0.4);
        let thin = raster.thin();
        for x in 10..30 {
            assert!(thin.thickness_ver(x, 10) <= 2, "column {x}");
        }
        assert!(thin.binarize().pixels().any(|p| p[0] == 0));
    }

    #[test]
    fn binarize_maps_ink_to_black() {
        let mut img = make_canvas(4, 4);
        img.put_pixel(1, 1, Luma([30]));
        let bin = Raster::new(img, 0.4).binarize();
        assert_eq!(bin.get_pixel(1, 1)[0], 0);
        assert_eq!(bin.get_pixel(2, 2)[0], 255);
    }
}
